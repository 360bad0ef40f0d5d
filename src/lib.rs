//! Suspendable execution units
//!
//! Generators, coroutines and asynchronous generators as a reusable state
//! machine: a unit pauses mid-execution, hands control back to its caller,
//! and later resumes exactly where it left off, threading return values,
//! faults and cancellation through arbitrarily deep delegation chains.
//!
//! The code a unit runs is supplied by an execution engine through the
//! [`runtime::engine::Frame`] trait; [`runtime::engine::ScriptFrame`] is a
//! closure-backed engine.
//!
//! # Example
//!
//! ```rust
//! use resumable::runtime::{ExecContext, ScriptFrame, Step, Value};
//! use resumable::unit::{Generator, Resumable};
//!
//! let ctx = ExecContext::new();
//! let gen = Generator::new(
//!     &ctx,
//!     "pair",
//!     ScriptFrame::yielding([Value::Int(1), Value::Int(2)], Value::str("done")).boxed(),
//! );
//! assert_eq!(gen.resume().unwrap(), Step::Yielded(Value::Int(1)));
//! assert_eq!(gen.resume().unwrap(), Step::Yielded(Value::Int(2)));
//! assert_eq!(gen.resume().unwrap(), Step::Complete(Value::str("done")));
//! ```

#![doc(html_root_url = "https://docs.rs/resumable")]
#![warn(rust_2018_idioms)]

pub mod runtime;
pub mod unit;

// Utility modules
pub mod util;

// Re-exports
pub use thiserror::Error;
pub use unit::{UnitError, UnitResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
