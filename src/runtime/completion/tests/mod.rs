//! Completion 协议单元测试

use proptest::prelude::*;

use crate::runtime::completion::{fetch, fetch_error, normalize, signal, Step};
use crate::runtime::fault::{Fault, FaultKind};
use crate::runtime::value::Value;
use crate::unit::errors::UnitError;

#[cfg(test)]
mod completion_tests {
    use super::*;

    #[test]
    fn test_no_fault_is_none() {
        assert_eq!(fetch(None), Ok(Value::None));
    }

    #[test]
    fn test_tuple_is_not_unpacked() {
        let t = Value::tuple([Value::Int(1), Value::Int(2)]);
        assert_eq!(fetch(Some(signal(t.clone()))), Ok(t));
    }

    #[test]
    fn test_fault_value_is_not_reraised() {
        let inner = Value::from(Fault::runtime("payload"));
        assert_eq!(fetch(Some(signal(inner.clone()))), Ok(inner));
    }

    #[test]
    fn test_other_fault_passes_through() {
        let f = Fault::runtime("x");
        assert_eq!(fetch(Some(f.clone())), Err(f));
    }

    #[test]
    fn test_async_completion_is_not_sync_completion() {
        let f = Fault::async_completion();
        assert_eq!(fetch(Some(f.clone())), Err(f));
    }

    #[test]
    fn test_fetch_error_keeps_protocol_errors() {
        assert_eq!(fetch_error(UnitError::Exhausted), Err(UnitError::Exhausted));
        assert_eq!(
            fetch_error(UnitError::Raised(signal(Value::Int(3)))),
            Ok(Value::Int(3))
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Err(UnitError::Raised(signal(Value::Int(1))))),
            Ok(Step::Complete(Value::Int(1)))
        );
        assert_eq!(
            normalize(Ok(Step::Yielded(Value::None))),
            Ok(Step::Yielded(Value::None))
        );
        let err = UnitError::Raised(Fault::new(FaultKind::Type));
        assert_eq!(normalize(Err(err.clone())), Err(err));
    }

    #[test]
    fn test_step_accessors() {
        let s = Step::Complete(Value::Int(4));
        assert!(s.is_complete());
        assert_eq!(s.value(), &Value::Int(4));
        assert_eq!(Step::Yielded(Value::Int(2)).into_value(), Value::Int(2));
    }
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z]{0,8}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Value::tuple)
    })
}

proptest! {
    #[test]
    fn prop_signal_fetch_identity(v in arb_value()) {
        prop_assert_eq!(fetch(Some(signal(v.clone()))), Ok(v));
    }
}
