//! Core benchmarking module
//!
//! Provides copy tasks, the strategy abstraction and registry, and the
//! harness that runs strategies sequentially, concurrently or async.

mod harness;
mod strategy;
mod task;

pub use harness::*;
pub use strategy::*;
pub use task::*;
