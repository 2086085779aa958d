//! Progress reporting module
//!
//! Shows how many benchmark runs have finished while a session is running.

mod reporter;

pub use reporter::*;
