//! Runtime support for execution units
//!
//! # Modules
//!
//! - `value`: payload values
//! - `fault`: fault objects and fault-descriptor validation
//! - `completion`: the completion protocol
//! - `pool`: bounded free lists
//! - `context`: per-thread execution state
//! - `engine`: the frame boundary and a closure-driven engine

pub mod completion;
pub mod context;
pub mod engine;
pub mod fault;
pub mod pool;
pub mod value;

pub use completion::Step;
pub use context::{Diagnostic, ExecContext};
pub use engine::{Action, Frame, FrameOutcome, Resumption, ScriptFrame};
pub use fault::{Fault, FaultKind};
pub use value::Value;
