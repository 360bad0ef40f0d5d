//! Suspendable execution units
//!
//! # Modules
//!
//! - `core`: the shared resume/throw/close state machine
//! - `delegate`: yield-from / await delegation to sub-iterators
//! - `variants`: Generator, Coroutine and AsyncGenerator handles
//! - `awaitable`: ASend / AThrow awaitables for async generators
//! - `finalize`: graceful shutdown before destruction
//! - `errors`: the unit error taxonomy

pub mod awaitable;
pub mod core;
pub mod delegate;
pub mod errors;
mod finalize;
pub mod state;
pub mod variants;

pub use awaitable::{ASend, AThrow, AwaitableState, ValueWrapper};
pub use self::core::ExecutionUnit;
pub use delegate::{Capabilities, DelegateInfo, ExternalIterator, SubIterator};
pub use errors::{UnitError, UnitResult};
pub use state::{UnitKind, UnitState};
pub use variants::{
    awaitable_iter, AsyncGenerator, AwaitHook, Awaitable, CoroWrapper, Coroutine, Generator,
    Resumable, UnitBuilder,
};

#[cfg(test)]
mod tests;
