//! # CopyBench - File Copy Strategy Benchmark
//!
//! CopyBench compares interchangeable file-copy strategies over the same
//! batch of files, executed sequentially, concurrently on threads, or as
//! async tasks, and reports wall-clock timing and per-task outcomes.
//!
//! ## Features
//!
//! - **Pluggable Strategies**: buffered, zero-copy, `std::fs::copy`, mmap, tokio
//! - **Execution Modes**: sequential, thread-per-task or bounded pool, async
//! - **Failures as Data**: a failing or panicking copy never aborts a run
//! - **Stable Ordering**: results always follow task input order
//! - **Reports**: text table or JSON, with speedup over sequential
//!
//! ## Quick Start
//!
//! ```no_run
//! use copybench::core::BenchmarkHarness;
//! use copybench::fs::{builtin_strategies, StrategyOptions, Workload};
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let registry = builtin_strategies(&StrategyOptions::default(), runtime.handle().clone()).unwrap();
//! let workload = Workload::in_temp_dir(&[50 * 1024, 75 * 1024, 100 * 1024]).unwrap();
//!
//! let harness = BenchmarkHarness::with_runtime(runtime.handle().clone());
//! let buffered = registry.get("buffered").unwrap();
//!
//! let tasks = workload.tasks("buffered-sequential").unwrap();
//! let sequential = harness.run_sequential(buffered.as_ref(), &tasks);
//!
//! let tasks = workload.tasks("buffered-concurrent").unwrap();
//! let concurrent = harness.run_concurrent(buffered.as_ref(), &tasks, 0);
//!
//! println!("{}", copybench::report::render_text(&[sequential, concurrent]));
//! workload.cleanup().unwrap();
//! ```
//!
//! ## Custom Strategies
//!
//! ```no_run
//! use copybench::core::{BenchmarkHarness, CopyTask, FnStrategy};
//! use copybench::error::BenchError;
//! use std::path::Path;
//!
//! let strategy = FnStrategy::new("std-copy", |src: &Path, dst: &Path| {
//!     std::fs::copy(src, dst).map_err(|e| BenchError::io(src, e))
//! });
//!
//! let tasks = vec![CopyTask::new("/data/a.bin", "/data/a.out").unwrap()];
//! let run = BenchmarkHarness::new().run_concurrent(&strategy, &tasks, 4);
//! assert_eq!(run.results().len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod progress;
pub mod report;

// Re-export commonly used types
pub use config::{BenchConfig, ExecutionConfig, ExecutionMode};
pub use core::{BenchmarkHarness, BenchmarkRun, CopyStrategy, CopyTask, StrategyRegistry};
pub use error::{BenchError, CopyError, Result};
pub use progress::ProgressReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use copybench::prelude::*;
    //! ```

    pub use crate::config::{BenchConfig, ExecutionConfig, ExecutionMode, OutputFormat};
    pub use crate::core::{
        AsyncCopyStrategy, BenchmarkHarness, BenchmarkRun, CopyStrategy, CopyTask, FnStrategy,
        StrategyRegistry, TaskResult,
    };
    pub use crate::error::{BenchError, CopyError, Result};
    pub use crate::fs::{builtin_strategies, StrategyOptions, Workload};
    pub use crate::progress::ProgressReporter;
    pub use crate::report::{render_json, render_text, Comparison, RunReport};
}
