//! Execution unit 单元测试


use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::context::{Diagnostic, ExecContext};
use crate::util::config::{PoolConfig, RuntimeConfig};

pub(super) fn ctx() -> Rc<ExecContext> {
    ExecContext::with_config(RuntimeConfig::default())
}

pub(super) fn pooled_ctx() -> Rc<ExecContext> {
    let mut config = RuntimeConfig::default();
    config.pool = PoolConfig {
        enabled: true,
        ..PoolConfig::default()
    };
    ExecContext::with_config(config)
}

/// Collect every diagnostic reported through `ctx`
pub(super) fn record_diagnostics(ctx: &ExecContext) -> Rc<RefCell<Vec<Diagnostic>>> {
    let seen: Rc<RefCell<Vec<Diagnostic>>> = Rc::default();
    let sink = seen.clone();
    ctx.set_diagnostic_hook(Some(Rc::new(move |d: &Diagnostic| {
        sink.borrow_mut().push(d.clone())
    })));
    seen
}

/// Shared event log written by test bodies
pub(super) type Log = Rc<RefCell<Vec<String>>>;

pub(super) fn log() -> Log {
    Rc::default()
}
