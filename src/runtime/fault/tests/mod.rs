//! Fault 单元测试
//!
//! 测试异常对象的构造、显示以及 throw 参数规范化

use std::error::Error as _;

use crate::runtime::fault::{Fault, FaultKind, ThrowArgs, Trace, TraceEntry};
use crate::runtime::value::Value;
use crate::unit::errors::UnitError;

fn sample_trace() -> Trace {
    Trace::new([TraceEntry {
        function: "outer".into(),
        line: 12,
    }])
}

#[cfg(test)]
mod construction_tests {
    use super::*;

    #[test]
    fn test_from_value_spreads_tuple() {
        let f = Fault::from_value(
            FaultKind::Completion,
            Value::tuple([Value::Int(1), Value::Int(2)]),
        );
        assert_eq!(f.args().len(), 2);
        assert_eq!(f.value(), Value::Int(1));
    }

    #[test]
    fn test_from_value_none_has_no_args() {
        let f = Fault::from_value(FaultKind::Runtime, Value::None);
        assert!(f.args().is_empty());
        assert_eq!(f.value(), Value::None);
    }

    #[test]
    fn test_with_args_is_verbatim() {
        let tuple = Value::tuple([Value::Int(1), Value::Int(2)]);
        let f = Fault::with_args(FaultKind::Completion, [tuple.clone()]);
        assert_eq!(f.value(), tuple);
    }

    #[test]
    fn test_cause_is_error_source() {
        let inner = Fault::new(FaultKind::Completion);
        let outer = Fault::runtime("wrapped").with_cause(inner.clone());
        assert_eq!(outer.cause(), Some(&inner));
        assert!(outer.source().is_some());
    }

    #[test]
    fn test_display() {
        assert_eq!(Fault::cancellation().to_string(), "Cancellation");
        assert_eq!(Fault::runtime("boom").to_string(), "RuntimeError: boom");
        assert_eq!(
            Fault::with_args(FaultKind::Value, [Value::Int(1), Value::Int(2)]).to_string(),
            "ValueError: (1, 2)"
        );
        assert_eq!(
            Fault::custom("KeyError", "k").to_string(),
            "KeyError: k"
        );
    }

    #[test]
    fn test_completion_kinds() {
        assert!(FaultKind::Completion.is_completion());
        assert!(FaultKind::AsyncCompletion.is_completion());
        assert!(!FaultKind::Cancellation.is_completion());
    }
}

#[cfg(test)]
mod throw_args_tests {
    use super::*;

    #[test]
    fn test_class_alone() {
        let f = ThrowArgs::new(Value::Kind(FaultKind::Runtime), None, None)
            .normalize()
            .unwrap();
        assert_eq!(f, Fault::new(FaultKind::Runtime));
    }

    #[test]
    fn test_class_with_value() {
        let f = ThrowArgs::new(Value::Kind(FaultKind::Value), Some(Value::str("bad")), None)
            .normalize()
            .unwrap();
        assert_eq!(f.message(), Some("bad"));
    }

    #[test]
    fn test_class_with_matching_instance() {
        let inst = Fault::runtime("same");
        let f = ThrowArgs::new(
            Value::Kind(FaultKind::Runtime),
            Some(Value::from(inst.clone())),
            None,
        )
        .normalize()
        .unwrap();
        assert_eq!(f, inst);
    }

    #[test]
    fn test_instance() {
        let inst = Fault::custom("Oops", "x");
        let f = ThrowArgs::from(inst.clone()).normalize().unwrap();
        assert_eq!(f, inst);
    }

    #[test]
    fn test_instance_with_separate_value_rejected() {
        let err = ThrowArgs::new(
            Value::from(Fault::runtime("x")),
            Some(Value::Int(1)),
            None,
        )
        .normalize()
        .unwrap_err();
        assert!(matches!(err, UnitError::InvalidThrowArgument(_)));
        assert_eq!(
            err.to_string(),
            "instance exception may not have a separate value"
        );
    }

    #[test]
    fn test_not_a_fault() {
        let err = ThrowArgs::new(Value::Int(3), None, None)
            .normalize()
            .unwrap_err();
        assert!(matches!(err, UnitError::NotAFault(ref t) if t == "int"));
    }

    #[test]
    fn test_bad_trace_rejected() {
        let err = ThrowArgs::new(
            Value::Kind(FaultKind::Runtime),
            None,
            Some(Value::Int(0)),
        )
        .normalize()
        .unwrap_err();
        assert!(matches!(err, UnitError::InvalidThrowArgument(_)));
    }

    #[test]
    fn test_trace_attached() {
        let f = ThrowArgs::new(
            Value::Kind(FaultKind::Runtime),
            Some(Value::None),
            Some(Value::Trace(sample_trace())),
        )
        .normalize()
        .unwrap();
        assert_eq!(f.trace().map(Trace::depth), Some(1));
    }
}
