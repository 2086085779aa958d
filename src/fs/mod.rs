//! File system module
//!
//! Provides the built-in copy strategies and the benchmark workload
//! (generated source files plus output cleanup).

mod strategies;
mod workload;

pub use strategies::*;
pub use workload::*;
