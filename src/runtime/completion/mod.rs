//! Completion protocol
//!
//! A unit finishing normally is reported as [`Step::Complete`], never as an
//! error. When a completion has to cross the fault channel (an external
//! iterator raising its completion signal, a completion injected by `throw`),
//! it travels as a `Completion` fault carrying exactly one argument: the
//! return value, wrapped as-is. [`fetch`] and [`normalize`] turn it back.

use crate::runtime::fault::{Fault, FaultKind};
use crate::runtime::value::Value;
use crate::unit::errors::{UnitError, UnitResult};

/// Outcome of one resume.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The unit suspended, handing out a value
    Yielded(Value),
    /// The unit finished, with its return value
    Complete(Value),
}

impl Step {
    pub fn is_complete(&self) -> bool {
        matches!(self, Step::Complete(_))
    }

    pub fn value(&self) -> &Value {
        match self {
            Step::Yielded(v) | Step::Complete(v) => v,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Step::Yielded(v) | Step::Complete(v) => v,
        }
    }
}

/// Build the completion fault for `value`.
///
/// The value is always the single argument, so a tuple or a fault instance
/// comes back out of [`fetch`] unchanged.
pub fn signal(value: Value) -> Fault {
    if value.is_none() {
        Fault::new(FaultKind::Completion)
    } else {
        Fault::with_args(FaultKind::Completion, [value])
    }
}

/// Extract a completion value from a pending fault.
///
/// No fault means completion with `None`; a `Completion` fault yields its
/// value; any other fault is handed back as the error.
pub fn fetch(pending: Option<Fault>) -> Result<Value, Fault> {
    match pending {
        None => Ok(Value::None),
        Some(f) if f.is(&FaultKind::Completion) => Ok(f.value()),
        Some(f) => Err(f),
    }
}

/// Like [`fetch`] for an operation result: a raised `Completion` fault is a
/// completion, every other error passes through.
pub fn fetch_error(err: UnitError) -> UnitResult<Value> {
    match err {
        UnitError::Raised(f) => fetch(Some(f)).map_err(UnitError::Raised),
        other => Err(other),
    }
}

/// Fold a raised completion fault into `Step::Complete`.
pub fn normalize(result: UnitResult<Step>) -> UnitResult<Step> {
    match result {
        Err(e) => fetch_error(e).map(Step::Complete),
        ok => ok,
    }
}

#[cfg(test)]
mod tests;
