//! Configuration module for CopyBench
//!
//! Provides CLI arguments, execution modes and the runtime benchmark
//! configuration.

mod settings;

pub use settings::*;
