//! Delegation layer
//!
//! A unit suspended inside `yield from` / `await` holds a [`SubIterator`].
//! Resumes are forwarded to it until it completes; faults and shutdown are
//! routed through it first.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::runtime::completion::{self, Step};
use crate::runtime::engine::{Frame, FrameOutcome, Resumption};
use crate::runtime::fault::{Fault, FaultKind};
use crate::runtime::value::Value;
use crate::unit::core::ExecutionUnit;
use crate::unit::errors::{UnitError, UnitResult};
use crate::unit::state::UnitKind;

/// Optional operations an external iterator supports.
///
/// Resolved once when the iterator is wrapped, not looked up per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub close: bool,
    pub throw: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        close: false,
        throw: false,
    };
    pub const ALL: Capabilities = Capabilities {
        close: true,
        throw: true,
    };
}

/// An iterator implemented outside the unit machinery.
///
/// Completion may be reported either as `Ok(Step::Complete(v))` or by raising
/// a `Completion` fault; both are accepted.
pub trait ExternalIterator {
    fn send(
        &mut self,
        value: Value,
    ) -> UnitResult<Step>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    fn close(&mut self) -> UnitResult<()> {
        Ok(())
    }

    fn throw(
        &mut self,
        fault: Fault,
    ) -> UnitResult<Step> {
        Err(UnitError::Raised(fault))
    }

    fn name(&self) -> &str {
        "iterator"
    }
}

/// What a unit is delegating to.
pub enum SubIterator {
    Unit(Rc<ExecutionUnit>),
    External {
        iter: Box<dyn ExternalIterator>,
        caps: Capabilities,
    },
}

/// Description of a delegation target, for introspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateInfo {
    Unit { kind: UnitKind, qualname: String },
    External { name: String },
}

impl fmt::Display for DelegateInfo {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            DelegateInfo::Unit { kind, qualname } => write!(f, "{} {}", kind, qualname),
            DelegateInfo::External { name } => f.write_str(name),
        }
    }
}

impl SubIterator {
    pub fn unit(unit: Rc<ExecutionUnit>) -> Self {
        SubIterator::Unit(unit)
    }

    pub fn external(iter: impl ExternalIterator + 'static) -> Self {
        let caps = iter.capabilities();
        SubIterator::External {
            iter: Box::new(iter),
            caps,
        }
    }

    /// Whether this is a coroutine unit
    pub fn is_coroutine(&self) -> bool {
        matches!(self, SubIterator::Unit(u) if u.kind() == UnitKind::Coroutine)
    }

    pub fn describe(&self) -> DelegateInfo {
        match self {
            SubIterator::Unit(u) => DelegateInfo::Unit {
                kind: u.kind(),
                qualname: u.qualname().to_string(),
            },
            SubIterator::External { iter, .. } => DelegateInfo::External {
                name: iter.name().to_string(),
            },
        }
    }

    /// Resume the target
    pub fn send(
        &mut self,
        value: Value,
    ) -> UnitResult<Step> {
        match self {
            SubIterator::Unit(u) => u.send(value),
            SubIterator::External { iter, .. } => completion::normalize(iter.send(value)),
        }
    }

    /// Shut the target down, if it supports it
    pub fn close(&mut self) -> UnitResult<()> {
        match self {
            SubIterator::Unit(u) => u.close(),
            SubIterator::External { iter, caps } if caps.close => iter.close(),
            SubIterator::External { .. } => Ok(()),
        }
    }
}

impl fmt::Debug for SubIterator {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_tuple("SubIterator").field(&self.describe()).finish()
    }
}

/// Result of routing an injected fault through the delegation target
pub(crate) enum Forwarded {
    /// The target yielded; the delegating unit stays suspended
    Yielded(Value),
    /// The target completed; resume the delegating unit with this value
    Finished(Value),
    /// Raise this fault in the delegating unit
    Raise(Fault),
}

impl ExecutionUnit {
    /// Route `fault` through the frame's delegation target.
    ///
    /// The caller has taken the frame out of the unit and marked the unit
    /// running.
    pub(crate) fn forward_throw(
        &self,
        frame: &mut dyn Frame,
        fault: Fault,
        close_on_cancel: bool,
    ) -> Forwarded {
        let Some(sub) = frame.delegation_target() else {
            return Forwarded::Raise(fault);
        };
        debug!(unit = %self.qualname(), target = %sub.describe(), fault = %fault, "forward throw");

        if fault.is(&FaultKind::Cancellation) && close_on_cancel {
            return match sub.close() {
                Ok(()) => Forwarded::Raise(fault),
                Err(e) => Forwarded::Raise(e.into_fault()),
            };
        }

        let result = match sub {
            SubIterator::Unit(u) => u.throw_inner(fault, close_on_cancel),
            SubIterator::External { iter, caps } if caps.throw => {
                completion::normalize(iter.throw(fault))
            }
            SubIterator::External { iter, caps } => {
                if caps.close {
                    if let Err(e) = iter.close() {
                        return Forwarded::Raise(e.into_fault());
                    }
                }
                return Forwarded::Raise(fault);
            }
        };

        match result {
            Ok(Step::Yielded(v)) => Forwarded::Yielded(v),
            Ok(Step::Complete(v)) => Forwarded::Finished(v),
            Err(e) => match completion::fetch_error(e) {
                Ok(v) => Forwarded::Finished(v),
                Err(e) => Forwarded::Raise(e.into_fault()),
            },
        }
    }

    /// Resume a delegating frame: forward to the target, falling back into
    /// the frame itself once the target finishes.
    pub(crate) fn drive(
        &self,
        frame: &mut dyn Frame,
        input: Resumption,
    ) -> FrameOutcome {
        let input = match input {
            Resumption::Send(value) => match frame.delegation_target() {
                Some(sub) => match sub.send(value) {
                    Ok(Step::Yielded(v)) => return FrameOutcome::Yielded(v),
                    Ok(Step::Complete(v)) => {
                        trace!(unit = %self.qualname(), "delegation finished");
                        drop(frame.end_delegation());
                        Resumption::Send(v)
                    }
                    Err(e) => {
                        drop(frame.end_delegation());
                        Resumption::Throw(e.into_fault())
                    }
                },
                None => Resumption::Send(value),
            },
            Resumption::Throw(fault) => {
                drop(frame.end_delegation());
                Resumption::Throw(fault)
            }
        };
        frame.run(self.context(), input)
    }
}
