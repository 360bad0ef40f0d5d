//! Value 单元测试

use std::sync::Arc;

use crate::runtime::fault::{Fault, FaultKind};
use crate::runtime::value::Value;

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn test_default_is_none() {
        assert!(Value::default().is_none());
        assert!(!Value::Int(0).is_none());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(7i64).as_int(), Some(7));
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(String::from("x")), Value::str("x"));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(
            Value::from(FaultKind::Runtime),
            Value::Kind(FaultKind::Runtime)
        );
    }

    #[test]
    fn test_fault_value_round_trip() {
        let v = Value::from(Fault::runtime("boom"));
        let fault = v.as_fault().expect("fault value");
        assert_eq!(fault.kind(), &FaultKind::Runtime);
        assert_eq!(fault.message(), Some("boom"));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::None.type_name(), "NoneType");
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::tuple([]).type_name(), "tuple");
        assert_eq!(Value::Kind(FaultKind::Type).type_name(), "type");
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::tuple([Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(
            Value::tuple([Value::Int(1), Value::str("a")]).to_string(),
            "(1, \"a\")"
        );
        assert_eq!(
            Value::List(vec![Value::Bool(true), Value::None]).to_string(),
            "[true, None]"
        );
        let rec = Value::record("Point", [(Arc::from("x"), Value::Int(3))]);
        assert_eq!(rec.to_string(), "Point { x: 3 }");
    }

    #[test]
    fn test_record_field_order_preserved() {
        let rec = Value::record(
            "R",
            [
                (Arc::from("b"), Value::Int(2)),
                (Arc::from("a"), Value::Int(1)),
            ],
        );
        match rec {
            Value::Record { fields, .. } => {
                let keys: Vec<&str> = fields.keys().map(|k| k.as_ref()).collect();
                assert_eq!(keys, vec!["b", "a"]);
            }
            _ => panic!("expected record"),
        }
    }
}
