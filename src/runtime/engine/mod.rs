//! Execution-engine boundary
//!
//! The unit machinery never interprets code itself. It owns a boxed [`Frame`]
//! (the engine's suspended execution context) and drives it with
//! [`Resumption`]s. [`ScriptFrame`] is a closure-backed engine for embedders
//! without a bytecode interpreter, and for tests.

mod script;

pub use script::{Action, ScriptFrame};

use std::rc::Rc;

use crate::runtime::context::ExecContext;
use crate::runtime::fault::Fault;
use crate::runtime::value::Value;
use crate::unit::delegate::SubIterator;

/// What a suspended frame is resumed with
#[derive(Debug, Clone, PartialEq)]
pub enum Resumption {
    /// Continue with a value (the result of the pending yield)
    Send(Value),
    /// Raise a fault at the suspension point
    Throw(Fault),
}

/// How a frame stopped running
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Yielded(Value),
    Returned(Value),
    Raised(Fault),
}

/// A suspended execution context.
///
/// After `Returned` or `Raised` the frame must report `is_complete`. A frame
/// resumed with `Throw` before it ever ran must raise the fault without
/// entering its code.
pub trait Frame {
    fn run(
        &mut self,
        ctx: &Rc<ExecContext>,
        input: Resumption,
    ) -> FrameOutcome;

    /// Code not entered yet
    fn is_just_started(&self) -> bool;

    fn is_complete(&self) -> bool;

    /// The iterator this frame is currently delegating to
    fn delegation_target(&mut self) -> Option<&mut SubIterator> {
        None
    }

    /// Stop delegating, handing the target back
    fn end_delegation(&mut self) -> Option<SubIterator> {
        None
    }

    /// Active exception-handling blocks (try/finally/with) at the current
    /// suspension point
    fn block_depth(&self) -> usize {
        0
    }
}
