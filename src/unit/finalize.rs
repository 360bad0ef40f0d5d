//! Finalization hook
//!
//! Runs once before a unit that never completed is destroyed. Nothing here
//! propagates: failures go to the context's diagnostics channel as
//! unraisable faults.

use std::mem::ManuallyDrop;

use tracing::debug;

use crate::runtime::context::Diagnostic;
use crate::unit::core::ExecutionUnit;
use crate::unit::errors::UnitError;
use crate::unit::state::{UnitKind, UnitState};

impl ExecutionUnit {
    /// Gracefully shut down a unit that is about to become unreachable.
    ///
    /// Idempotent. Called automatically on drop; embedders with a two-phase
    /// teardown may call it earlier.
    pub fn finalize(&self) {
        if self.is_running() || self.shell.finalized.get() {
            return;
        }
        self.shell.finalized.set(true);
        if self.is_completed() {
            return;
        }

        let saved_pending = self.ctx.take_pending_fault();
        let exc_depth = self.ctx.exc_depth();
        debug!(unit = %self, "finalize");

        self.run_finalizer();

        debug_assert_eq!(self.ctx.exc_depth(), exc_depth);
        self.ctx.set_pending_fault(saved_pending);
    }

    fn run_finalizer(&self) {
        if self.kind() == UnitKind::AsyncGenerator {
            let closed = self
                .shell
                .async_gen()
                .is_some_and(|state| state.closed.get());
            let hook = self.finalizer.borrow().clone();
            if let (Some(hook), false) = (hook, closed) {
                if let Err(error) = hook(self) {
                    self.report_unraisable(error);
                }
                return;
            }
        }

        if self.kind() == UnitKind::Coroutine && self.state() == UnitState::JustStarted {
            let origin = self
                .shell
                .coroutine()
                .and_then(|c| c.origin.borrow().clone());
            self.ctx.report(Diagnostic::NeverAwaited {
                qualname: self.qualname(),
                origin,
            });
            return;
        }

        if let Err(error) = self.close() {
            self.report_unraisable(error);
        }
    }

    fn report_unraisable(
        &self,
        error: UnitError,
    ) {
        self.ctx.report(Diagnostic::Unraisable {
            context: format!("Exception ignored in: {}", self),
            error,
        });
    }
}

impl Drop for ExecutionUnit {
    fn drop(&mut self) {
        for hook in self.teardown.get_mut().drain(..) {
            hook();
        }
        self.finalize();
        drop(self.frame.get_mut().take());

        // SAFETY: `shell` is never touched again after being taken here.
        let shell = unsafe { ManuallyDrop::take(&mut self.shell) };
        self.ctx.pools().release_unit(shell);
    }
}
