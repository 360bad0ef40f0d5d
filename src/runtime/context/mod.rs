//! Execution context
//!
//! `ExecContext` is the per-thread state the unit machinery consults while it
//! drives units: the handled-exception stack, a pending-fault slot, the call
//! stack used for coroutine origin tracking, async-generator hooks, the
//! diagnostics channel and the shared pools. It is injected explicitly into
//! every unit at creation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{error, warn};

use crate::runtime::fault::Fault;
use crate::runtime::pool::Pools;
use crate::runtime::value::Value;
use crate::unit::awaitable::ValueWrapper;
use crate::unit::core::ExecutionUnit;
use crate::unit::errors::{UnitError, UnitResult};
use crate::unit::variants::AsyncGenerator;
use crate::util::config::{self, RuntimeConfig};

/// A saved handled-exception context.
///
/// Each running unit pushes its own entry. Lookups only see the innermost
/// entry, so a running unit never observes its caller's handled fault.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExcInfo {
    pub fault: Option<Fault>,
}

/// One call-stack entry, as reported by the embedding engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub filename: Arc<str>,
    pub line: u32,
    pub function: Arc<str>,
}

impl FrameInfo {
    pub fn new(
        filename: impl Into<Arc<str>>,
        line: u32,
        function: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            line,
            function: function.into(),
        }
    }

    fn is_comprehension(&self) -> bool {
        matches!(&*self.function, "<genexpr>" | "<listcomp>" | "<dictcomp>")
    }
}

impl fmt::Display for FrameInfo {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{} in {}", self.filename, self.line, self.function)
    }
}

/// Out-of-band reports that never reach a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A fault raised where nobody can receive it (finalization)
    Unraisable { context: String, error: UnitError },
    /// A coroutine destroyed before it was ever resumed
    NeverAwaited {
        qualname: Arc<str>,
        origin: Option<Vec<FrameInfo>>,
    },
}

pub type DiagnosticHook = Rc<dyn Fn(&Diagnostic)>;
pub type FirstIterHook = Rc<dyn Fn(&AsyncGenerator) -> UnitResult<()>>;
pub type FinalizerHook = Rc<dyn Fn(&ExecutionUnit) -> UnitResult<()>>;

/// Async-generator lifecycle hooks, picked up by each async generator on its
/// first operation.
#[derive(Clone, Default)]
pub struct AsyncGenHooks {
    pub firstiter: Option<FirstIterHook>,
    pub finalizer: Option<FinalizerHook>,
}

impl fmt::Debug for AsyncGenHooks {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("AsyncGenHooks")
            .field("firstiter", &self.firstiter.is_some())
            .field("finalizer", &self.finalizer.is_some())
            .finish()
    }
}

/// Per-thread execution state shared by every unit created from it.
pub struct ExecContext {
    config: RuntimeConfig,
    pools: Arc<Pools>,
    exc_stack: RefCell<SmallVec<[ExcInfo; 8]>>,
    pending: RefCell<Option<Fault>>,
    call_stack: RefCell<Vec<FrameInfo>>,
    hooks: RefCell<AsyncGenHooks>,
    diagnostics: RefCell<Option<DiagnosticHook>>,
}

impl ExecContext {
    /// A context using the process-wide configuration
    pub fn new() -> Rc<Self> {
        Self::with_config(config::global())
    }

    pub fn with_config(config: RuntimeConfig) -> Rc<Self> {
        let pools = Arc::new(Pools::new(&config.pool));
        Self::with_pools(config, pools)
    }

    /// A context sharing an existing set of pools
    pub fn with_pools(
        config: RuntimeConfig,
        pools: Arc<Pools>,
    ) -> Rc<Self> {
        let mut base = SmallVec::new();
        base.push(ExcInfo::default());
        Rc::new(Self {
            config,
            pools,
            exc_stack: RefCell::new(base),
            pending: RefCell::new(None),
            call_stack: RefCell::new(Vec::new()),
            hooks: RefCell::new(AsyncGenHooks::default()),
            diagnostics: RefCell::new(None),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn pools(&self) -> &Arc<Pools> {
        &self.pools
    }

    // ------------------------------------------------------------------
    // Handled-exception stack
    // ------------------------------------------------------------------

    pub(crate) fn push_exc(
        &self,
        info: ExcInfo,
    ) {
        self.exc_stack.borrow_mut().push(info);
    }

    pub(crate) fn pop_exc(&self) -> ExcInfo {
        let mut stack = self.exc_stack.borrow_mut();
        if stack.len() > 1 {
            stack.pop().unwrap_or_default()
        } else {
            ExcInfo::default()
        }
    }

    /// Number of entries, including the base entry
    pub fn exc_depth(&self) -> usize {
        self.exc_stack.borrow().len()
    }

    /// Fault handled by the innermost entry, if any. While a unit runs this is
    /// the unit's own context.
    pub fn handled_fault(&self) -> Option<Fault> {
        self.exc_stack
            .borrow()
            .last()
            .and_then(|info| info.fault.clone())
    }

    /// Set the fault handled by the innermost entry (the running unit's own
    /// context while a unit runs).
    pub fn set_handled_fault(
        &self,
        fault: Option<Fault>,
    ) {
        if let Some(top) = self.exc_stack.borrow_mut().last_mut() {
            top.fault = fault;
        }
    }

    // ------------------------------------------------------------------
    // Pending fault
    // ------------------------------------------------------------------

    pub fn set_pending_fault(
        &self,
        fault: Option<Fault>,
    ) {
        *self.pending.borrow_mut() = fault;
    }

    pub fn take_pending_fault(&self) -> Option<Fault> {
        self.pending.borrow_mut().take()
    }

    pub fn pending_fault(&self) -> Option<Fault> {
        self.pending.borrow().clone()
    }

    // ------------------------------------------------------------------
    // Call stack
    // ------------------------------------------------------------------

    /// Record an engine frame as entered. The entry is popped when the guard
    /// drops.
    pub fn enter_frame(
        &self,
        info: FrameInfo,
    ) -> CallGuard<'_> {
        self.call_stack.borrow_mut().push(info);
        CallGuard { ctx: self }
    }

    /// Up to `depth` innermost entries, innermost first
    pub fn call_stack_snapshot(
        &self,
        depth: usize,
    ) -> Vec<FrameInfo> {
        self.call_stack
            .borrow()
            .iter()
            .rev()
            .take(depth)
            .cloned()
            .collect()
    }

    /// Innermost caller, skipping comprehension frames
    pub fn creator_frame(&self) -> Option<FrameInfo> {
        self.call_stack
            .borrow()
            .iter()
            .rev()
            .find(|f| !f.is_comprehension())
            .cloned()
    }

    // ------------------------------------------------------------------
    // Hooks and diagnostics
    // ------------------------------------------------------------------

    pub fn set_async_gen_hooks(
        &self,
        hooks: AsyncGenHooks,
    ) {
        *self.hooks.borrow_mut() = hooks;
    }

    pub fn async_gen_hooks(&self) -> AsyncGenHooks {
        self.hooks.borrow().clone()
    }

    pub fn set_diagnostic_hook(
        &self,
        hook: Option<DiagnosticHook>,
    ) {
        *self.diagnostics.borrow_mut() = hook;
    }

    /// Log a diagnostic and hand it to the installed hook.
    pub fn report(
        &self,
        diagnostic: Diagnostic,
    ) {
        match &diagnostic {
            Diagnostic::Unraisable { context, error } => {
                error!(%context, %error, "Exception ignored");
            }
            Diagnostic::NeverAwaited { qualname, origin } => match origin {
                Some(frames) if !frames.is_empty() => {
                    let origin = frames
                        .iter()
                        .map(FrameInfo::to_string)
                        .collect::<Vec<_>>()
                        .join("; ");
                    warn!(%origin, "coroutine '{}' was never awaited", qualname);
                }
                _ => warn!("coroutine '{}' was never awaited", qualname),
            },
        }
        let hook = self.diagnostics.borrow().clone();
        if let Some(hook) = hook {
            hook(&diagnostic);
        }
    }

    // ------------------------------------------------------------------
    // Async-yield marker
    // ------------------------------------------------------------------

    /// Mark a value as yielded by an async generator's own code, as opposed
    /// to passed through from an awaited object.
    pub fn wrap_async_value(
        &self,
        value: Value,
    ) -> Value {
        let mut wrapper = self.pools.acquire_wrapper();
        wrapper.set_payload(value);
        Value::AsyncYield(wrapper)
    }

    pub fn unwrap_async_value(
        &self,
        mut wrapper: Box<ValueWrapper>,
    ) -> Value {
        let value = wrapper.take_payload();
        self.pools.release_wrapper(wrapper);
        value
    }
}

impl fmt::Debug for ExecContext {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("config", &self.config)
            .field("exc_depth", &self.exc_depth())
            .field("call_depth", &self.call_stack.borrow().len())
            .field("hooks", &*self.hooks.borrow())
            .finish()
    }
}

/// Pops its call-stack entry on drop
pub struct CallGuard<'a> {
    ctx: &'a ExecContext,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.ctx.call_stack.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests;
