//! Async-generator awaitables
//!
//! `asend`/`anext` produce an [`ASend`], `athrow`/`aclose` an [`AThrow`].
//! Each drives the underlying async generator one step per `send` and turns
//! the generator's own yields (marked with [`ValueWrapper`]) into completion
//! of the awaitable; raw yields pass through to whatever drives the await.

use std::fmt;
use std::mem::ManuallyDrop;

use tracing::trace;

use crate::runtime::completion::Step;
use crate::runtime::fault::{Fault, FaultKind, ThrowArgs};
use crate::runtime::pool::Recycle;
use crate::runtime::value::Value;
use crate::unit::delegate::{Capabilities, ExternalIterator};
use crate::unit::errors::{UnitError, UnitResult};
use crate::unit::state::UnitKind;
use crate::unit::variants::{AsyncGenerator, Resumable};

/// Carrier for a value yielded by an async generator's own code.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueWrapper {
    payload: Value,
}

impl ValueWrapper {
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub(crate) fn set_payload(
        &mut self,
        value: Value,
    ) {
        self.payload = value;
    }

    pub(crate) fn take_payload(&mut self) -> Value {
        std::mem::take(&mut self.payload)
    }
}

impl Recycle for ValueWrapper {
    fn recycle(&mut self) {
        self.payload = Value::None;
    }
}

/// Awaitable lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AwaitableState {
    #[default]
    Init,
    Iter,
    Closed,
}

/// Pooled part of an [`ASend`]
#[derive(Debug, Default)]
pub(crate) struct ASendState {
    sendval: Option<Value>,
    state: AwaitableState,
}

impl Recycle for ASendState {
    fn recycle(&mut self) {
        self.sendval = None;
        self.state = AwaitableState::Init;
    }
}

impl AsyncGenerator {
    /// Translate a core step of this generator into an awaitable step.
    fn unwrap_step(
        &self,
        result: UnitResult<Step>,
    ) -> UnitResult<Step> {
        let state = self.async_state();
        match result {
            Ok(Step::Yielded(Value::AsyncYield(wrapper))) => {
                state.running_async.set(false);
                let value = self.unit().context().unwrap_async_value(wrapper);
                Ok(Step::Complete(value))
            }
            Ok(Step::Yielded(v)) => Ok(Step::Yielded(v)),
            Ok(Step::Complete(_)) => {
                state.closed.set(true);
                state.running_async.set(false);
                Err(UnitError::Raised(Fault::async_completion()))
            }
            Err(e) => {
                if e.is_raised(&FaultKind::AsyncCompletion) || e.is_raised(&FaultKind::Cancellation) {
                    state.closed.set(true);
                }
                state.running_async.set(false);
                Err(e)
            }
        }
    }

    fn release_wrapper(
        &self,
        value: Value,
    ) {
        if let Value::AsyncYield(wrapper) = value {
            let _ = self.unit().context().unwrap_async_value(wrapper);
        }
    }
}

/// Awaitable returned by `asend` and `anext`.
pub struct ASend {
    gen: AsyncGenerator,
    inner: ManuallyDrop<Box<ASendState>>,
}

impl ASend {
    pub(crate) fn new(
        gen: AsyncGenerator,
        sendval: Option<Value>,
    ) -> Self {
        let mut inner = gen.unit().context().pools().acquire_asend();
        inner.sendval = sendval;
        inner.state = AwaitableState::Init;
        Self {
            gen,
            inner: ManuallyDrop::new(inner),
        }
    }

    pub fn state(&self) -> AwaitableState {
        self.inner.state
    }

    pub fn generator(&self) -> &AsyncGenerator {
        &self.gen
    }

    /// Advance the awaitable. `Complete(v)` means the generator yielded `v`;
    /// the generator finishing surfaces as an `AsyncCompletion` fault.
    pub fn send(
        &mut self,
        arg: Value,
    ) -> UnitResult<Step> {
        if self.inner.state == AwaitableState::Closed {
            return Err(UnitError::AwaitableReused("__anext__()/asend()"));
        }

        let mut arg = arg;
        if self.inner.state == AwaitableState::Init {
            if self.gen.is_running_async() {
                return Err(UnitError::AlreadyRunningAsync("anext()"));
            }
            if arg.is_none() {
                arg = self.inner.sendval.take().unwrap_or_default();
            }
            self.inner.state = AwaitableState::Iter;
        }

        trace!(gen = %self.gen, "asend");
        self.gen.async_state().running_async.set(true);
        let result = self.gen.unit().send(arg);
        let result = self.gen.unwrap_step(result);
        if !matches!(result, Ok(Step::Yielded(_))) {
            self.inner.state = AwaitableState::Closed;
        }
        result
    }

    /// Inject a fault into the generator through this awaitable
    pub fn throw(
        &mut self,
        fault: Fault,
    ) -> UnitResult<Step> {
        if self.inner.state == AwaitableState::Closed {
            return Err(UnitError::AwaitableReused("__anext__()/asend()"));
        }
        let result = self.gen.unit().throw(fault);
        let result = self.gen.unwrap_step(result);
        if !matches!(result, Ok(Step::Yielded(_))) {
            self.inner.state = AwaitableState::Closed;
        }
        result
    }

    pub fn close(&mut self) {
        self.inner.state = AwaitableState::Closed;
    }
}

impl ExternalIterator for ASend {
    fn send(
        &mut self,
        value: Value,
    ) -> UnitResult<Step> {
        ASend::send(self, value)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn close(&mut self) -> UnitResult<()> {
        ASend::close(self);
        Ok(())
    }

    fn throw(
        &mut self,
        fault: Fault,
    ) -> UnitResult<Step> {
        ASend::throw(self, fault)
    }

    fn name(&self) -> &str {
        "async_generator_asend"
    }
}

impl Drop for ASend {
    fn drop(&mut self) {
        // SAFETY: `inner` is never touched again after being taken here.
        let inner = unsafe { ManuallyDrop::take(&mut self.inner) };
        self.gen.unit().context().pools().release_asend(inner);
    }
}

impl fmt::Debug for ASend {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ASend")
            .field("gen", &self.gen)
            .field("state", &self.inner.state)
            .finish()
    }
}

/// Awaitable returned by `athrow` and `aclose`.
///
/// With no throw arguments it is in close mode: the generator is marked
/// closed up front, and its terminating (by returning or by letting the
/// cancellation escape) completes the awaitable normally.
#[derive(Debug)]
pub struct AThrow {
    gen: AsyncGenerator,
    args: Option<ThrowArgs>,
    closing: bool,
    state: AwaitableState,
}

impl AThrow {
    pub(crate) fn new(
        gen: AsyncGenerator,
        args: Option<ThrowArgs>,
    ) -> Self {
        let closing = args.is_none();
        Self {
            gen,
            args,
            closing,
            state: AwaitableState::Init,
        }
    }

    pub fn state(&self) -> AwaitableState {
        self.state
    }

    pub fn is_close_mode(&self) -> bool {
        self.closing
    }

    fn op(&self) -> &'static str {
        if self.closing {
            "aclose()"
        } else {
            "athrow()"
        }
    }

    pub fn send(
        &mut self,
        arg: Value,
    ) -> UnitResult<Step> {
        if self.state == AwaitableState::Closed {
            return Err(UnitError::AwaitableReused("aclose()/athrow()"));
        }
        if self.gen.unit().is_completed() {
            self.state = AwaitableState::Closed;
            return Ok(Step::Complete(Value::None));
        }

        if self.state == AwaitableState::Init {
            return self.first_step(arg);
        }

        trace!(gen = %self.gen, op = self.op(), "athrow resume");
        let result = self.gen.unit().send(arg);
        self.settle(result)
    }

    fn first_step(
        &mut self,
        arg: Value,
    ) -> UnitResult<Step> {
        let state = self.gen.async_state();
        if state.running_async.get() {
            self.state = AwaitableState::Closed;
            return Err(UnitError::AlreadyRunningAsync(self.op()));
        }
        if state.closed.get() {
            self.state = AwaitableState::Closed;
            return Err(UnitError::Raised(Fault::async_completion()));
        }
        if !arg.is_none() {
            return Err(UnitError::BadResumeArgument(UnitKind::Coroutine));
        }

        let fault = match self.args.take() {
            None => Fault::cancellation(),
            Some(args) => match args.normalize() {
                Ok(f) => f,
                Err(e) => {
                    self.state = AwaitableState::Closed;
                    return Err(e);
                }
            },
        };

        trace!(gen = %self.gen, op = self.op(), "athrow start");
        self.state = AwaitableState::Iter;
        state.running_async.set(true);
        if self.closing {
            state.closed.set(true);
        }
        let result = self.gen.unit().throw_inner(fault, false);
        self.settle(result)
    }

    /// Common tail for a step of the generator made on behalf of this
    /// awaitable.
    fn settle(
        &mut self,
        result: UnitResult<Step>,
    ) -> UnitResult<Step> {
        if self.closing {
            return match result {
                Ok(Step::Yielded(v)) if v.is_async_yield() => {
                    self.gen.release_wrapper(v);
                    self.yield_close()
                }
                Ok(Step::Yielded(v)) => Ok(Step::Yielded(v)),
                other => self.check_error(other),
            };
        }
        match self.gen.unwrap_step(result) {
            Ok(Step::Yielded(v)) => Ok(Step::Yielded(v)),
            other => self.check_error(other),
        }
    }

    fn yield_close(&mut self) -> UnitResult<Step> {
        self.gen.async_state().running_async.set(false);
        self.state = AwaitableState::Closed;
        Err(UnitError::AsyncCloseIgnored)
    }

    fn check_error(
        &mut self,
        result: UnitResult<Step>,
    ) -> UnitResult<Step> {
        self.gen.async_state().running_async.set(false);
        self.state = AwaitableState::Closed;
        if !self.closing {
            return result;
        }
        match result {
            Ok(Step::Complete(_)) => Ok(Step::Complete(Value::None)),
            Err(e)
                if e.is_raised(&FaultKind::AsyncCompletion)
                    || e.is_raised(&FaultKind::Cancellation) =>
            {
                Ok(Step::Complete(Value::None))
            }
            other => other,
        }
    }

    /// Inject a fault into the generator through this awaitable
    pub fn throw(
        &mut self,
        fault: Fault,
    ) -> UnitResult<Step> {
        if self.state == AwaitableState::Closed {
            return Err(UnitError::AwaitableReused("aclose()/athrow()"));
        }
        let result = self.gen.unit().throw(fault);
        self.settle(result)
    }

    pub fn close(&mut self) {
        self.state = AwaitableState::Closed;
    }
}

impl ExternalIterator for AThrow {
    fn send(
        &mut self,
        value: Value,
    ) -> UnitResult<Step> {
        AThrow::send(self, value)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn close(&mut self) -> UnitResult<()> {
        AThrow::close(self);
        Ok(())
    }

    fn throw(
        &mut self,
        fault: Fault,
    ) -> UnitResult<Step> {
        AThrow::throw(self, fault)
    }

    fn name(&self) -> &str {
        "async_generator_athrow"
    }
}
