//! Faults: the exception objects threaded through units
//!
//! A `Fault` carries a kind, positional arguments, an optional trace and an
//! optional cause. Units move faults in three directions: raised out of a
//! unit's code, injected into a suspended unit (`throw`), and saved/restored
//! as the handled-exception context around each resume.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::runtime::value::Value;
use crate::unit::errors::{UnitError, UnitResult};

/// Fault classes known to the unit machinery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Synchronous completion signal (carries the return value)
    Completion,
    /// Asynchronous completion signal (async generator exhausted)
    AsyncCompletion,
    /// Injected by shutdown to unwind a unit
    Cancellation,
    Runtime,
    Type,
    Value,
    /// Any embedder-defined class
    Custom(Arc<str>),
}

impl FaultKind {
    pub fn name(&self) -> &str {
        match self {
            FaultKind::Completion => "Completion",
            FaultKind::AsyncCompletion => "AsyncCompletion",
            FaultKind::Cancellation => "Cancellation",
            FaultKind::Runtime => "RuntimeError",
            FaultKind::Type => "TypeError",
            FaultKind::Value => "ValueError",
            FaultKind::Custom(name) => name,
        }
    }

    /// Completion or async completion
    #[inline]
    pub fn is_completion(&self) -> bool {
        matches!(self, FaultKind::Completion | FaultKind::AsyncCompletion)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One traceback entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub function: Arc<str>,
    pub line: u32,
}

/// An immutable traceback, innermost entry last
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trace {
    entries: Arc<[TraceEntry]>,
}

impl Trace {
    pub fn new(entries: impl IntoIterator<Item = TraceEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}

/// A fault instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    kind: FaultKind,
    args: SmallVec<[Value; 1]>,
    trace: Option<Trace>,
    cause: Option<Arc<Fault>>,
}

impl Fault {
    /// A fault with no arguments
    pub fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            args: SmallVec::new(),
            trace: None,
            cause: None,
        }
    }

    /// A fault whose arguments are taken verbatim.
    pub fn with_args(
        kind: FaultKind,
        args: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self {
            kind,
            args: args.into_iter().collect(),
            trace: None,
            cause: None,
        }
    }

    /// Raise-a-class convention: `None` means no arguments and a tuple is
    /// spread into positional arguments.
    ///
    /// Never use this to carry a completion value; see
    /// [`crate::runtime::completion::signal`].
    pub fn from_value(
        kind: FaultKind,
        value: Value,
    ) -> Self {
        match value {
            Value::None => Self::new(kind),
            Value::Tuple(items) => Self::with_args(kind, items.iter().cloned()),
            other => Self::with_args(kind, [other]),
        }
    }

    pub fn with_message(
        kind: FaultKind,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self::with_args(kind, [Value::Str(message.into())])
    }

    pub fn cancellation() -> Self {
        Self::new(FaultKind::Cancellation)
    }

    pub fn async_completion() -> Self {
        Self::new(FaultKind::AsyncCompletion)
    }

    pub fn runtime(message: impl Into<Arc<str>>) -> Self {
        Self::with_message(FaultKind::Runtime, message)
    }

    pub fn type_error(message: impl Into<Arc<str>>) -> Self {
        Self::with_message(FaultKind::Type, message)
    }

    pub fn value_error(message: impl Into<Arc<str>>) -> Self {
        Self::with_message(FaultKind::Value, message)
    }

    pub fn custom(
        name: impl Into<Arc<str>>,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self::with_message(FaultKind::Custom(name.into()), message)
    }

    pub fn with_trace(
        mut self,
        trace: Trace,
    ) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_cause(
        mut self,
        cause: Fault,
    ) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    #[inline]
    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    #[inline]
    pub fn is(
        &self,
        kind: &FaultKind,
    ) -> bool {
        &self.kind == kind
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// First argument, or `None` when there are none.
    pub fn value(&self) -> Value {
        self.args.first().cloned().unwrap_or(Value::None)
    }

    /// The first argument when it is a string
    pub fn message(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    pub fn cause(&self) -> Option<&Fault> {
        self.cause.as_deref()
    }
}

impl fmt::Display for Fault {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.args.as_slice() {
            [] => write!(f, "{}", self.kind),
            [Value::Str(msg)] => write!(f, "{}: {}", self.kind, msg),
            [single] => write!(f, "{}: {}", self.kind, single),
            many => {
                write!(f, "{}: (", self.kind)?;
                for (i, arg) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// The loose `(type, value, trace)` triple accepted by `throw`-style entry
/// points, before it has been validated into a `Fault`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThrowArgs {
    pub typ: Value,
    pub value: Option<Value>,
    pub trace: Option<Value>,
}

impl ThrowArgs {
    pub fn new(
        typ: Value,
        value: Option<Value>,
        trace: Option<Value>,
    ) -> Self {
        Self { typ, value, trace }
    }

    /// Validate the triple and build the fault it describes.
    pub fn normalize(self) -> UnitResult<Fault> {
        let trace = match self.trace {
            None | Some(Value::None) => None,
            Some(Value::Trace(t)) => Some(t),
            Some(_) => {
                return Err(UnitError::InvalidThrowArgument(
                    "throw() third argument must be a traceback object",
                ))
            }
        };

        let fault = match self.typ {
            Value::Kind(kind) => match self.value {
                None | Some(Value::None) => Fault::new(kind),
                Some(Value::Fault(inst)) if inst.kind() == &kind => (*inst).clone(),
                Some(v) => Fault::from_value(kind, v),
            },
            Value::Fault(inst) => {
                if matches!(self.value, Some(ref v) if !v.is_none()) {
                    return Err(UnitError::InvalidThrowArgument(
                        "instance exception may not have a separate value",
                    ));
                }
                (*inst).clone()
            }
            other => return Err(UnitError::NotAFault(other.type_name().to_string())),
        };

        Ok(match trace {
            Some(t) => fault.with_trace(t),
            None => fault,
        })
    }
}

impl From<Fault> for ThrowArgs {
    fn from(fault: Fault) -> Self {
        Self::new(Value::from(fault), None, None)
    }
}

#[cfg(test)]
mod tests;
