//! Runtime values carried across suspension points
//!
//! A `Value` is the opaque payload a unit yields, returns, receives on resume
//! or carries inside a fault. The unit machinery never inspects payloads except
//! to recognise the async-yield marker and the `None` sentinel.

mod value;

pub use value::Value;

#[cfg(test)]
mod tests;
