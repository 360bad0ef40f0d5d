//! Execution unit core
//!
//! `ExecutionUnit` is the state machine shared by all three variants. It owns
//! the engine frame, the running flag and the unit's saved exception context,
//! and implements resume / throw / close on top of the engine boundary.

use std::cell::RefCell;
use std::fmt;
use std::mem::ManuallyDrop;
use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::runtime::completion::Step;
use crate::runtime::context::{ExcInfo, ExecContext, FinalizerHook};
use crate::runtime::engine::{Frame, FrameOutcome, Resumption};
use crate::runtime::fault::{Fault, FaultKind, ThrowArgs};
use crate::runtime::value::Value;
use crate::unit::delegate::{DelegateInfo, Forwarded};
use crate::unit::errors::{UnitError, UnitResult};
use crate::unit::state::{UnitKind, UnitShell, UnitState};

type TeardownHook = Box<dyn FnOnce()>;

/// A suspendable execution unit.
///
/// Always handled through `Rc`; identity is the `Rc` allocation. The engine
/// frame is moved out of `frame` while the unit runs, so a re-entrant call
/// sees the running flag instead of a borrowed cell.
pub struct ExecutionUnit {
    pub(crate) shell: ManuallyDrop<Box<UnitShell>>,
    pub(crate) frame: RefCell<Option<Box<dyn Frame>>>,
    pub(crate) ctx: Rc<ExecContext>,
    pub(crate) finalizer: RefCell<Option<FinalizerHook>>,
    pub(crate) teardown: RefCell<Vec<TeardownHook>>,
}

/// Marks a unit running and swaps its exception context onto the context
/// stack; undoes both on drop.
struct RunGuard<'a> {
    unit: &'a ExecutionUnit,
}

impl<'a> RunGuard<'a> {
    fn enter(unit: &'a ExecutionUnit) -> Self {
        unit.shell.running.set(true);
        let saved = unit.shell.exc_state.take();
        unit.ctx.push_exc(saved);
        Self { unit }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let info = self.unit.ctx.pop_exc();
        self.unit.shell.exc_state.replace(info);
        self.unit.shell.running.set(false);
    }
}

impl ExecutionUnit {
    pub(crate) fn from_parts(
        ctx: &Rc<ExecContext>,
        shell: Box<UnitShell>,
        frame: Box<dyn Frame>,
    ) -> Rc<Self> {
        Rc::new(Self {
            shell: ManuallyDrop::new(shell),
            frame: RefCell::new(Some(frame)),
            ctx: Rc::clone(ctx),
            finalizer: RefCell::new(None),
            teardown: RefCell::new(Vec::new()),
        })
    }

    #[inline]
    pub fn kind(&self) -> UnitKind {
        self.shell.kind
    }

    pub fn context(&self) -> &Rc<ExecContext> {
        &self.ctx
    }

    pub fn name(&self) -> Arc<str> {
        self.shell.name.borrow().clone()
    }

    pub fn qualname(&self) -> Arc<str> {
        self.shell.qualname.borrow().clone()
    }

    pub fn set_name(
        &self,
        name: impl Into<Arc<str>>,
    ) {
        *self.shell.name.borrow_mut() = name.into();
    }

    pub fn set_qualname(
        &self,
        qualname: impl Into<Arc<str>>,
    ) {
        *self.shell.qualname.borrow_mut() = qualname.into();
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn state(&self) -> UnitState {
        if self.shell.running.get() {
            return UnitState::Running;
        }
        match self.frame.borrow().as_deref() {
            None => UnitState::Completed,
            Some(f) if f.is_complete() => UnitState::Completed,
            Some(f) if f.is_just_started() => UnitState::JustStarted,
            Some(_) => UnitState::Suspended,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.shell.running.get()
    }

    pub fn is_completed(&self) -> bool {
        self.state() == UnitState::Completed
    }

    pub fn is_just_started(&self) -> bool {
        self.state() == UnitState::JustStarted
    }

    /// Started, paused at a yield, and not running
    pub fn is_suspended(&self) -> bool {
        self.state() == UnitState::Suspended
    }

    /// The current delegation target
    pub fn yield_from(&self) -> Option<DelegateInfo> {
        if self.is_running() {
            return None;
        }
        let mut slot = self.frame.borrow_mut();
        let info = slot.as_mut()?.delegation_target().map(|sub| sub.describe());
        info
    }

    /// Not completed and suspended inside an exception-handling block, so
    /// shutting it down may run user cleanup code.
    pub fn needs_finalizing(&self) -> bool {
        if self.is_running() {
            return false;
        }
        match self.frame.borrow().as_deref() {
            Some(f) => !f.is_complete() && f.block_depth() > 0,
            None => false,
        }
    }

    /// The saved handled-exception context (empty unless suspended inside
    /// an exception handler)
    pub fn exc_state(&self) -> ExcInfo {
        self.shell.exc_state.borrow().clone()
    }

    /// Register a callback run once when the unit is destroyed, before
    /// finalization
    pub fn on_teardown(
        &self,
        hook: impl FnOnce() + 'static,
    ) {
        self.teardown.borrow_mut().push(Box::new(hook));
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Resume with `value`
    pub fn send(
        &self,
        value: Value,
    ) -> UnitResult<Step> {
        self.send_ex(Resumption::Send(value), false)
    }

    /// Resume with `None`
    pub fn resume(&self) -> UnitResult<Step> {
        self.send(Value::None)
    }

    /// Inject `fault` at the suspension point (forwarding it through any
    /// delegation target first)
    pub fn throw(
        &self,
        fault: Fault,
    ) -> UnitResult<Step> {
        self.throw_inner(fault, true)
    }

    /// Validate a loose fault descriptor, then [`throw`](Self::throw) it
    pub fn throw_args(
        &self,
        args: ThrowArgs,
    ) -> UnitResult<Step> {
        let fault = args.normalize()?;
        self.throw(fault)
    }

    /// Shut the unit down by injecting cancellation.
    ///
    /// Succeeds when the unit terminates (returns, re-raises cancellation,
    /// or was already complete). A unit that yields instead fails with
    /// `IgnoredShutdown` and is torn down anyway.
    pub fn close(&self) -> UnitResult<()> {
        let kind = self.kind();
        let fault = match self.close_delegate() {
            Some(err) => err.into_fault(),
            None => Fault::cancellation(),
        };
        match self.send_ex(Resumption::Throw(fault), true) {
            Ok(Step::Yielded(_)) => {
                trace!(unit = %self.qualname(), "shutdown ignored");
                self.release_frame();
                Err(UnitError::IgnoredShutdown(kind))
            }
            Ok(Step::Complete(_)) => Ok(()),
            Err(UnitError::Raised(f))
                if f.is(&FaultKind::Completion) || f.is(&FaultKind::Cancellation) =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Close the delegation target ahead of a shutdown. Returns the error
    /// closing it raised.
    fn close_delegate(&self) -> Option<UnitError> {
        if self.is_running() {
            return None;
        }
        let mut frame = self.frame.borrow_mut().take()?;
        self.shell.running.set(true);
        let result = frame.delegation_target().map(|sub| sub.close());
        self.shell.running.set(false);
        *self.frame.borrow_mut() = Some(frame);
        result.and_then(Result::err)
    }

    pub(crate) fn throw_inner(
        &self,
        fault: Fault,
        close_on_cancel: bool,
    ) -> UnitResult<Step> {
        if self.is_running() {
            return Err(UnitError::AlreadyRunning(self.kind()));
        }
        let taken = self.frame.borrow_mut().take();
        let Some(mut frame) = taken else {
            return self.send_ex(Resumption::Throw(fault), false);
        };
        if frame.delegation_target().is_none() {
            *self.frame.borrow_mut() = Some(frame);
            return self.send_ex(Resumption::Throw(fault), false);
        }

        self.shell.running.set(true);
        let forwarded = self.forward_throw(frame.as_mut(), fault, close_on_cancel);
        self.shell.running.set(false);

        match forwarded {
            Forwarded::Yielded(v) => {
                *self.frame.borrow_mut() = Some(frame);
                Ok(Step::Yielded(v))
            }
            Forwarded::Finished(v) => {
                let done = frame.end_delegation();
                *self.frame.borrow_mut() = Some(frame);
                drop(done);
                self.send_ex(Resumption::Send(v), false)
            }
            Forwarded::Raise(f) => {
                *self.frame.borrow_mut() = Some(frame);
                self.send_ex(Resumption::Throw(f), false)
            }
        }
    }

    /// The resume state machine.
    ///
    /// `closing` is set by shutdown: resuming a completed coroutine is then
    /// not an error.
    pub(crate) fn send_ex(
        &self,
        input: Resumption,
        closing: bool,
    ) -> UnitResult<Step> {
        let kind = self.kind();
        if self.is_running() {
            return Err(UnitError::AlreadyRunning(kind));
        }

        let taken = self.frame.borrow_mut().take();
        let mut frame = match taken {
            Some(f) if !f.is_complete() => f,
            _ => {
                if kind == UnitKind::Coroutine && !closing {
                    return Err(UnitError::Exhausted);
                }
                return match input {
                    Resumption::Send(_) => Ok(Step::Complete(Value::None)),
                    Resumption::Throw(f) => Err(UnitError::Raised(f)),
                };
            }
        };

        if frame.is_just_started() {
            if let Resumption::Send(v) = &input {
                if !v.is_none() {
                    *self.frame.borrow_mut() = Some(frame);
                    return Err(UnitError::BadResumeArgument(kind));
                }
            }
        }

        trace!(unit = %self.qualname(), kind = %kind, throw = matches!(input, Resumption::Throw(_)), "resume");
        let outcome = {
            let _guard = RunGuard::enter(self);
            self.drive(frame.as_mut(), input)
        };

        match outcome {
            FrameOutcome::Yielded(v) => {
                *self.frame.borrow_mut() = Some(frame);
                Ok(Step::Yielded(v))
            }
            FrameOutcome::Returned(v) => {
                trace!(unit = %self.qualname(), "returned");
                self.shell.exc_state.replace(ExcInfo::default());
                drop(frame);
                Ok(Step::Complete(v))
            }
            FrameOutcome::Raised(f) => {
                trace!(unit = %self.qualname(), fault = %f, "raised");
                self.shell.exc_state.replace(ExcInfo::default());
                drop(frame);
                Err(self.escape(f))
            }
        }
    }

    /// Translate a fault leaving the unit's code
    fn escape(
        &self,
        fault: Fault,
    ) -> UnitError {
        let kind = self.kind();
        // async completion is only a protocol signal for async generators
        let leaked = fault.kind().is_completion()
            && (kind == UnitKind::AsyncGenerator || fault.is(&FaultKind::Completion));
        if leaked {
            UnitError::EscapedCompletionFault {
                kind,
                signal: fault.kind().clone(),
                source: fault,
            }
        } else {
            UnitError::Raised(fault)
        }
    }

    /// Drop the engine frame, leaving the unit completed
    pub(crate) fn release_frame(&self) {
        let frame = self.frame.borrow_mut().take();
        self.shell.exc_state.replace(ExcInfo::default());
        drop(frame);
    }
}

impl fmt::Display for ExecutionUnit {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "<{} object {} at {:p}>",
            self.kind().type_name(),
            self.qualname(),
            self as *const Self
        )
    }
}

impl fmt::Debug for ExecutionUnit {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ExecutionUnit")
            .field("kind", &self.kind())
            .field("qualname", &self.qualname())
            .field("state", &self.state())
            .finish()
    }
}
