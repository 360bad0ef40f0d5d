//! Unit errors

use thiserror::Error;

use crate::runtime::fault::{Fault, FaultKind};
use crate::unit::state::UnitKind;

/// Unit result
pub type UnitResult<T> = Result<T, UnitError>;

/// Errors surfaced by unit operations.
///
/// Everything except `Raised` is a protocol error produced by the unit
/// machinery itself; `Raised` carries a fault that came out of unit code
/// (or was thrown in and passed through) unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("{0} already executing")]
    AlreadyRunning(UnitKind),

    #[error("{0}: asynchronous generator is already running")]
    AlreadyRunningAsync(&'static str),

    #[error("cannot reuse already awaited coroutine")]
    Exhausted,

    #[error("can't send non-None value to a just-started {0}")]
    BadResumeArgument(UnitKind),

    #[error("exceptions must be classes or instances deriving from BaseException, not {0}")]
    NotAFault(String),

    #[error("{0}")]
    InvalidThrowArgument(&'static str),

    #[error("{0} ignored Cancellation")]
    IgnoredShutdown(UnitKind),

    #[error("async generator ignored Cancellation")]
    AsyncCloseIgnored,

    #[error("{kind} raised {signal}")]
    EscapedCompletionFault {
        kind: UnitKind,
        signal: FaultKind,
        #[source]
        source: Fault,
    },

    #[error("cannot reuse already awaited {0}")]
    AwaitableReused(&'static str),

    #[error("{0}")]
    NotAwaitable(String),

    #[error(transparent)]
    Raised(Fault),
}

impl UnitError {
    /// The fault this error becomes when it has to travel through the fault
    /// channel, e.g. when a sub-iterator's error is injected into its
    /// delegating unit.
    pub fn into_fault(self) -> Fault {
        match self {
            UnitError::Raised(fault) => fault,
            UnitError::EscapedCompletionFault {
                kind,
                signal,
                source,
            } => Fault::runtime(format!("{} raised {}", kind, signal)).with_cause(source),
            e @ UnitError::AlreadyRunning(_) => Fault::value_error(e.to_string()),
            e @ (UnitError::BadResumeArgument(_)
            | UnitError::NotAFault(_)
            | UnitError::InvalidThrowArgument(_)
            | UnitError::NotAwaitable(_)) => Fault::type_error(e.to_string()),
            e => Fault::runtime(e.to_string()),
        }
    }

    /// The carried fault, when this is a pass-through fault
    pub fn raised(&self) -> Option<&Fault> {
        match self {
            UnitError::Raised(f) => Some(f),
            _ => None,
        }
    }

    /// Whether this is a pass-through fault of the given kind
    pub fn is_raised(
        &self,
        kind: &FaultKind,
    ) -> bool {
        self.raised().is_some_and(|f| f.is(kind))
    }
}

impl From<Fault> for UnitError {
    fn from(fault: Fault) -> Self {
        UnitError::Raised(fault)
    }
}
