//! Generator, Coroutine and AsyncGenerator handles
//!
//! The three variants share one state machine ([`ExecutionUnit`]); the typed
//! handles only decide which operations are exposed and carry the
//! variant-specific extras (origin tracking, await protocol, async hooks).

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use tracing::debug;

use crate::runtime::completion::Step;
use crate::runtime::context::{ExecContext, FrameInfo};
use crate::runtime::engine::Frame;
use crate::runtime::fault::{Fault, ThrowArgs};
use crate::runtime::value::Value;
use crate::unit::awaitable::{ASend, AThrow};
use crate::unit::core::ExecutionUnit;
use crate::unit::delegate::{Capabilities, DelegateInfo, ExternalIterator, SubIterator};
use crate::unit::errors::{UnitError, UnitResult};
use crate::unit::state::{AsyncGenState, UnitKind, UnitState, VariantState};

/// Builder for execution units.
///
/// # Example
///
/// ```rust
/// use resumable::runtime::context::ExecContext;
/// use resumable::runtime::engine::ScriptFrame;
/// use resumable::runtime::value::Value;
/// use resumable::unit::{Resumable, UnitBuilder};
///
/// let ctx = ExecContext::new();
/// let gen = UnitBuilder::generator("count")
///     .qualname("Counter.count")
///     .build_generator(&ctx, ScriptFrame::yielding([Value::Int(1)], Value::None).boxed());
/// assert_eq!(gen.resume().unwrap().into_value(), Value::Int(1));
/// ```
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    kind: UnitKind,
    name: Arc<str>,
    qualname: Option<Arc<str>>,
    iterable_coroutine: bool,
}

impl UnitBuilder {
    pub fn new(
        kind: UnitKind,
        name: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            qualname: None,
            iterable_coroutine: false,
        }
    }

    pub fn generator(name: impl Into<Arc<str>>) -> Self {
        Self::new(UnitKind::Generator, name)
    }

    pub fn coroutine(name: impl Into<Arc<str>>) -> Self {
        Self::new(UnitKind::Coroutine, name)
    }

    pub fn async_generator(name: impl Into<Arc<str>>) -> Self {
        Self::new(UnitKind::AsyncGenerator, name)
    }

    /// Qualified name; defaults to the name
    pub fn qualname(
        mut self,
        qualname: impl Into<Arc<str>>,
    ) -> Self {
        self.qualname = Some(qualname.into());
        self
    }

    /// Allow a generator to be awaited (generator-based coroutine)
    pub fn iterable_coroutine(
        mut self,
        flag: bool,
    ) -> Self {
        self.iterable_coroutine = flag;
        self
    }

    pub fn build(
        self,
        ctx: &Rc<ExecContext>,
        frame: Box<dyn Frame>,
    ) -> Rc<ExecutionUnit> {
        let shell = ctx.pools().acquire_unit(self.kind);
        let qualname = self.qualname.unwrap_or_else(|| self.name.clone());
        *shell.name.borrow_mut() = self.name;
        *shell.qualname.borrow_mut() = qualname;

        match &shell.variant {
            VariantState::Generator { iterable_coroutine } => {
                iterable_coroutine.set(self.iterable_coroutine);
            }
            VariantState::Coroutine(state) => {
                let depth = ctx.config().coroutine.origin_tracking_depth;
                if depth > 0 {
                    *state.origin.borrow_mut() = Some(ctx.call_stack_snapshot(depth));
                }
                *state.creator.borrow_mut() = ctx.creator_frame();
            }
            VariantState::AsyncGenerator(_) => {}
        }

        let unit = ExecutionUnit::from_parts(ctx, shell, frame);
        debug!(unit = %unit, "created");
        unit
    }

    pub fn build_generator(
        self,
        ctx: &Rc<ExecContext>,
        frame: Box<dyn Frame>,
    ) -> Generator {
        Generator(Self { kind: UnitKind::Generator, ..self }.build(ctx, frame))
    }

    pub fn build_coroutine(
        self,
        ctx: &Rc<ExecContext>,
        frame: Box<dyn Frame>,
    ) -> Coroutine {
        Coroutine(Self { kind: UnitKind::Coroutine, ..self }.build(ctx, frame))
    }

    pub fn build_async_generator(
        self,
        ctx: &Rc<ExecContext>,
        frame: Box<dyn Frame>,
    ) -> AsyncGenerator {
        AsyncGenerator(Self { kind: UnitKind::AsyncGenerator, ..self }.build(ctx, frame))
    }
}

/// Operations common to every variant.
pub trait Resumable {
    fn unit(&self) -> &Rc<ExecutionUnit>;

    fn send(
        &self,
        value: Value,
    ) -> UnitResult<Step> {
        self.unit().send(value)
    }

    fn resume(&self) -> UnitResult<Step> {
        self.unit().resume()
    }

    fn throw(
        &self,
        fault: Fault,
    ) -> UnitResult<Step> {
        self.unit().throw(fault)
    }

    fn throw_args(
        &self,
        args: ThrowArgs,
    ) -> UnitResult<Step> {
        self.unit().throw_args(args)
    }

    fn close(&self) -> UnitResult<()> {
        self.unit().close()
    }

    fn state(&self) -> UnitState {
        self.unit().state()
    }

    fn is_running(&self) -> bool {
        self.unit().is_running()
    }

    fn name(&self) -> Arc<str> {
        self.unit().name()
    }

    fn qualname(&self) -> Arc<str> {
        self.unit().qualname()
    }

    fn downgrade(&self) -> Weak<ExecutionUnit> {
        Rc::downgrade(self.unit())
    }
}

macro_rules! unit_handle {
    ($name:ident, $kind:expr) => {
        impl $name {
            /// Wrap a unit of the matching kind
            pub fn from_unit(unit: Rc<ExecutionUnit>) -> Option<Self> {
                (unit.kind() == $kind).then(|| $name(unit))
            }

            pub fn into_unit(self) -> Rc<ExecutionUnit> {
                self.0
            }
        }

        impl Resumable for $name {
            fn unit(&self) -> &Rc<ExecutionUnit> {
                &self.0
            }
        }

        impl From<$name> for SubIterator {
            fn from(handle: $name) -> Self {
                SubIterator::Unit(handle.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
            ) -> fmt::Result {
                fmt::Display::fmt(&*self.0, f)
            }
        }
    };
}

/// A generator
#[derive(Debug, Clone)]
pub struct Generator(Rc<ExecutionUnit>);

/// A coroutine
#[derive(Debug, Clone)]
pub struct Coroutine(Rc<ExecutionUnit>);

/// An asynchronous generator
#[derive(Debug, Clone)]
pub struct AsyncGenerator(Rc<ExecutionUnit>);

unit_handle!(Generator, UnitKind::Generator);
unit_handle!(Coroutine, UnitKind::Coroutine);
unit_handle!(AsyncGenerator, UnitKind::AsyncGenerator);

impl Generator {
    pub fn new(
        ctx: &Rc<ExecContext>,
        name: &str,
        frame: Box<dyn Frame>,
    ) -> Self {
        UnitBuilder::generator(name).build_generator(ctx, frame)
    }

    /// Whether this generator may be awaited
    pub fn is_iterable_coroutine(&self) -> bool {
        match &self.0.shell.variant {
            VariantState::Generator { iterable_coroutine } => iterable_coroutine.get(),
            _ => false,
        }
    }
}

/// Iterates yielded values. A fault ends iteration after being returned once.
impl Iterator for Generator {
    type Item = UnitResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.0.resume() {
            Ok(Step::Yielded(v)) => Some(Ok(v)),
            Ok(Step::Complete(_)) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Coroutine {
    pub fn new(
        ctx: &Rc<ExecContext>,
        name: &str,
        frame: Box<dyn Frame>,
    ) -> Self {
        UnitBuilder::coroutine(name).build_coroutine(ctx, frame)
    }

    /// Call-stack snapshot taken at creation, innermost first. `None` when
    /// origin tracking was off.
    pub fn origin(&self) -> Option<Vec<FrameInfo>> {
        self.0
            .shell
            .coroutine()
            .and_then(|c| c.origin.borrow().clone())
    }

    /// The frame that created this coroutine
    pub fn creator(&self) -> Option<FrameInfo> {
        self.0
            .shell
            .coroutine()
            .and_then(|c| c.creator.borrow().clone())
    }

    /// What this coroutine is currently awaiting
    pub fn awaiting(&self) -> Option<DelegateInfo> {
        self.0.yield_from()
    }

    /// The iterator that drives this coroutine from an await expression
    pub fn await_iter(&self) -> CoroWrapper {
        CoroWrapper { coro: self.clone() }
    }
}

/// Iterator view of a coroutine
#[derive(Debug, Clone)]
pub struct CoroWrapper {
    coro: Coroutine,
}

impl CoroWrapper {
    pub fn coroutine(&self) -> &Coroutine {
        &self.coro
    }
}

impl ExternalIterator for CoroWrapper {
    fn send(
        &mut self,
        value: Value,
    ) -> UnitResult<Step> {
        self.coro.send(value)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn close(&mut self) -> UnitResult<()> {
        Resumable::close(&self.coro)
    }

    fn throw(
        &mut self,
        fault: Fault,
    ) -> UnitResult<Step> {
        Resumable::throw(&self.coro, fault)
    }

    fn name(&self) -> &str {
        "coroutine_wrapper"
    }
}

/// A custom awaitable object
pub trait AwaitHook {
    /// The iterator an await expression delegates to
    fn await_iter(&self) -> UnitResult<SubIterator>;
}

/// Anything an await expression may be applied to
pub enum Awaitable {
    Coroutine(Coroutine),
    Generator(Generator),
    Custom(Box<dyn AwaitHook>),
}

/// Resolve the iterator an await expression delegates to.
pub fn awaitable_iter(target: Awaitable) -> UnitResult<SubIterator> {
    match target {
        Awaitable::Coroutine(c) => Ok(c.into()),
        Awaitable::Generator(g) if g.is_iterable_coroutine() => Ok(g.into()),
        Awaitable::Generator(_) => Err(UnitError::NotAwaitable(
            "object generator can't be used in 'await' expression".into(),
        )),
        Awaitable::Custom(hook) => {
            let iter = hook.await_iter()?;
            if iter.is_coroutine() {
                return Err(UnitError::NotAwaitable(
                    "__await__() returned a coroutine".into(),
                ));
            }
            Ok(iter)
        }
    }
}

impl AsyncGenerator {
    pub fn new(
        ctx: &Rc<ExecContext>,
        name: &str,
        frame: Box<dyn Frame>,
    ) -> Self {
        UnitBuilder::async_generator(name).build_async_generator(ctx, frame)
    }

    pub(crate) fn async_state(&self) -> &AsyncGenState {
        match &self.0.shell.variant {
            VariantState::AsyncGenerator(state) => state,
            _ => unreachable!("AsyncGenerator handle over a non-async unit"),
        }
    }

    /// An asend/athrow/aclose awaitable is in progress
    pub fn is_running_async(&self) -> bool {
        self.async_state().running_async.get()
    }

    /// Permanently finished: exhausted, or closed by aclose
    pub fn is_closed(&self) -> bool {
        self.async_state().closed.get()
    }

    /// What this generator is currently awaiting
    pub fn awaiting(&self) -> Option<DelegateInfo> {
        self.0.yield_from()
    }

    /// Pick up the context's firstiter/finalizer hooks, once.
    fn init_hooks(&self) -> UnitResult<()> {
        let state = self.async_state();
        if state.hooks_inited.replace(true) {
            return Ok(());
        }
        let hooks = self.0.context().async_gen_hooks();
        if let Some(finalizer) = hooks.finalizer {
            *self.0.finalizer.borrow_mut() = Some(finalizer);
        }
        if let Some(firstiter) = hooks.firstiter {
            firstiter(self)?;
        }
        Ok(())
    }

    /// Awaitable for the next value
    pub fn anext(&self) -> UnitResult<ASend> {
        self.init_hooks()?;
        Ok(ASend::new(self.clone(), None))
    }

    /// Awaitable that resumes the generator with `value`
    pub fn asend(
        &self,
        value: Value,
    ) -> UnitResult<ASend> {
        self.init_hooks()?;
        Ok(ASend::new(self.clone(), Some(value)))
    }

    /// Awaitable that injects `fault`
    pub fn athrow(
        &self,
        fault: Fault,
    ) -> UnitResult<AThrow> {
        self.athrow_args(ThrowArgs::from(fault))
    }

    /// Awaitable that injects a loose fault descriptor, validated when the
    /// awaitable first runs
    pub fn athrow_args(
        &self,
        args: ThrowArgs,
    ) -> UnitResult<AThrow> {
        self.init_hooks()?;
        Ok(AThrow::new(self.clone(), Some(args)))
    }

    /// Awaitable that shuts the generator down
    pub fn aclose(&self) -> UnitResult<AThrow> {
        self.init_hooks()?;
        Ok(AThrow::new(self.clone(), None))
    }
}
