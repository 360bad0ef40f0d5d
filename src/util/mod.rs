//! Ambient utilities: configuration and logging

pub mod config;
pub mod logger;
