//! ExecContext 单元测试

use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::context::{Diagnostic, ExcInfo, ExecContext, FrameInfo};
use crate::runtime::fault::Fault;
use crate::runtime::value::Value;
use crate::unit::errors::UnitError;
use crate::util::config::RuntimeConfig;

fn ctx() -> Rc<ExecContext> {
    ExecContext::with_config(RuntimeConfig::default())
}

#[cfg(test)]
mod exc_stack_tests {
    use super::*;

    #[test]
    fn test_base_entry() {
        let ctx = ctx();
        assert_eq!(ctx.exc_depth(), 1);
        assert_eq!(ctx.handled_fault(), None);
        // the base entry is never popped
        assert_eq!(ctx.pop_exc(), ExcInfo::default());
        assert_eq!(ctx.exc_depth(), 1);
    }

    #[test]
    fn test_handled_fault_is_innermost_only() {
        let ctx = ctx();
        ctx.set_handled_fault(Some(Fault::runtime("outer")));
        ctx.push_exc(ExcInfo::default());
        assert_eq!(ctx.handled_fault(), None);

        ctx.set_handled_fault(Some(Fault::runtime("inner")));
        assert_eq!(ctx.handled_fault(), Some(Fault::runtime("inner")));

        let popped = ctx.pop_exc();
        assert_eq!(popped.fault, Some(Fault::runtime("inner")));
        assert_eq!(ctx.handled_fault(), Some(Fault::runtime("outer")));
    }

    #[test]
    fn test_pending_fault_slot() {
        let ctx = ctx();
        ctx.set_pending_fault(Some(Fault::cancellation()));
        assert_eq!(ctx.pending_fault(), Some(Fault::cancellation()));
        assert_eq!(ctx.take_pending_fault(), Some(Fault::cancellation()));
        assert_eq!(ctx.pending_fault(), None);
    }
}

#[cfg(test)]
mod call_stack_tests {
    use super::*;

    #[test]
    fn test_snapshot_innermost_first() {
        let ctx = ctx();
        let _a = ctx.enter_frame(FrameInfo::new("m.py", 1, "main"));
        let _b = ctx.enter_frame(FrameInfo::new("m.py", 5, "helper"));
        let snap = ctx.call_stack_snapshot(5);
        assert_eq!(snap.len(), 2);
        assert_eq!(&*snap[0].function, "helper");
        assert_eq!(ctx.call_stack_snapshot(1).len(), 1);
    }

    #[test]
    fn test_guard_pops() {
        let ctx = ctx();
        {
            let _g = ctx.enter_frame(FrameInfo::new("m.py", 1, "main"));
            assert_eq!(ctx.call_stack_snapshot(8).len(), 1);
        }
        assert!(ctx.call_stack_snapshot(8).is_empty());
    }

    #[test]
    fn test_creator_skips_comprehensions() {
        let ctx = ctx();
        let _a = ctx.enter_frame(FrameInfo::new("m.py", 3, "run"));
        let _b = ctx.enter_frame(FrameInfo::new("m.py", 4, "<genexpr>"));
        let creator = ctx.creator_frame().unwrap();
        assert_eq!(&*creator.function, "run");
    }
}

#[cfg(test)]
mod diagnostics_tests {
    use super::*;

    #[test]
    fn test_report_reaches_hook() {
        let ctx = ctx();
        let seen: Rc<RefCell<Vec<Diagnostic>>> = Rc::default();
        let sink = seen.clone();
        ctx.set_diagnostic_hook(Some(Rc::new(move |d: &Diagnostic| sink.borrow_mut().push(d.clone()))));

        ctx.report(Diagnostic::Unraisable {
            context: "here".into(),
            error: UnitError::Exhausted,
        });
        ctx.report(Diagnostic::NeverAwaited {
            qualname: "f".into(),
            origin: None,
        });
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_report_without_hook() {
        ctx().report(Diagnostic::NeverAwaited {
            qualname: "f".into(),
            origin: Some(vec![FrameInfo::new("m.py", 1, "main")]),
        });
    }
}

#[cfg(test)]
mod async_marker_tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap_recycles() {
        let ctx = ctx();
        let wrapped = ctx.wrap_async_value(Value::Int(5));
        assert!(wrapped.is_async_yield());
        let inner = match wrapped {
            Value::AsyncYield(w) => ctx.unwrap_async_value(w),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(inner, Value::Int(5));

        let _again = ctx.wrap_async_value(Value::None);
        assert_eq!(ctx.pools().wrapper_stats().reused, 1);
    }
}
