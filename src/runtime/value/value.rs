//! `Value` definition and conversions

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::runtime::fault::{Fault, FaultKind, Trace};
use crate::unit::awaitable::ValueWrapper;

/// A runtime value.
///
/// Every variant is cheap to clone (`Arc` for anything larger than a word)
/// and `Send`, so pooled shells holding values can move between threads.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// The `None` sentinel
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Immutable tuple
    Tuple(Arc<[Value]>),
    /// List snapshot
    List(Vec<Value>),
    /// Named record with ordered fields
    Record {
        name: Arc<str>,
        fields: Arc<IndexMap<Arc<str>, Value>>,
    },
    /// A fault class (raise-by-class form)
    Kind(FaultKind),
    /// A fault instance
    Fault(Arc<Fault>),
    /// A traceback
    Trace(Trace),
    /// Async-generator yield marker
    AsyncYield(Box<ValueWrapper>),
}

impl Value {
    /// Build a string value
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Build a tuple value
    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    /// Build a record value
    pub fn record(
        name: impl Into<Arc<str>>,
        fields: impl IntoIterator<Item = (Arc<str>, Value)>,
    ) -> Self {
        Value::Record {
            name: name.into(),
            fields: Arc::new(fields.into_iter().collect()),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Whether this is the async-generator yield marker
    #[inline]
    pub fn is_async_yield(&self) -> bool {
        matches!(self, Value::AsyncYield(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            Value::Fault(f) => Some(&**f),
            _ => None,
        }
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Record { .. } => "record",
            Value::Kind(_) => "type",
            Value::Fault(_) => "fault",
            Value::Trace(_) => "traceback",
            Value::AsyncYield(_) => "async_generator_wrapped_value",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Fault> for Value {
    fn from(f: Fault) -> Self {
        Value::Fault(Arc::new(f))
    }
}

impl From<FaultKind> for Value {
    fn from(k: FaultKind) -> Self {
        Value::Kind(k)
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Record { name, fields } => {
                write!(f, "{} {{", name)?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", k, v)?;
                }
                write!(f, " }}")
            }
            Value::Kind(kind) => write!(f, "<class '{}'>", kind),
            Value::Fault(fault) => write!(f, "{}", fault),
            Value::Trace(trace) => write!(f, "<traceback depth={}>", trace.depth()),
            Value::AsyncYield(w) => write!(f, "<wrapped {}>", w.payload()),
        }
    }
}
