//! Copy tasks, per-task outcomes and finalized benchmark runs

use crate::config::ExecutionMode;
use crate::error::{BenchError, CopyError, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A single (source, destination) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CopyTask {
    /// File to read
    pub source: PathBuf,
    /// File to write
    pub destination: PathBuf,
}

impl CopyTask {
    /// Create a new copy task; both paths must be non-empty
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let destination = destination.into();

        if source.as_os_str().is_empty() {
            return Err(BenchError::InvalidTask("source path is empty".to_string()));
        }
        if destination.as_os_str().is_empty() {
            return Err(BenchError::InvalidTask(
                "destination path is empty".to_string(),
            ));
        }

        Ok(Self {
            source,
            destination,
        })
    }

    /// Source path
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Destination path
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// Successful task completion info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSuccess {
    /// Bytes written to the destination
    pub bytes_copied: u64,
    /// Time spent inside the strategy
    pub duration: Duration,
}

/// Outcome of one task under one strategy
#[derive(Debug)]
pub struct TaskResult {
    /// Input position of the task within its batch
    pub index: usize,
    /// The task this outcome belongs to
    pub task: CopyTask,
    /// Success or captured failure
    pub outcome: std::result::Result<TaskSuccess, CopyError>,
}

impl TaskResult {
    /// Build a result from a strategy's return value
    pub(crate) fn from_strategy(
        index: usize,
        task: CopyTask,
        result: Result<u64>,
        duration: Duration,
    ) -> Self {
        let outcome = match result {
            Ok(bytes_copied) => Ok(TaskSuccess {
                bytes_copied,
                duration,
            }),
            Err(cause) => Err(CopyError::new(task.clone(), cause)),
        };

        Self {
            index,
            task,
            outcome,
        }
    }

    /// Check if the task succeeded
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Bytes copied, zero on failure
    pub fn bytes_copied(&self) -> u64 {
        self.outcome.as_ref().map(|s| s.bytes_copied).unwrap_or(0)
    }

    /// The captured error, if the task failed
    pub fn error(&self) -> Option<&CopyError> {
        self.outcome.as_ref().err()
    }
}

/// One strategy executed over one batch of tasks.
///
/// Built by the harness once every task has reached a terminal outcome and
/// read-only afterwards.
#[derive(Debug)]
pub struct BenchmarkRun {
    strategy: String,
    mode: ExecutionMode,
    max_parallelism: usize,
    results: Vec<TaskResult>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration: Duration,
}

impl BenchmarkRun {
    pub(crate) fn new(
        strategy: impl Into<String>,
        mode: ExecutionMode,
        max_parallelism: usize,
        results: Vec<TaskResult>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let finished_at = started_at
            + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());

        Self {
            strategy: strategy.into(),
            mode,
            max_parallelism,
            results,
            started_at,
            finished_at,
            duration,
        }
    }

    /// Name of the strategy that was run
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Execution mode
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Parallelism bound used (0 = one unit per task)
    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    /// Task results in input order
    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    /// Wall-clock start
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock end
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Elapsed time from first invocation start to last completion
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Number of successful tasks
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of failed tasks
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Check if every task succeeded
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Captured failures in input order
    pub fn failures(&self) -> impl Iterator<Item = &CopyError> {
        self.results.iter().filter_map(|r| r.error())
    }

    /// Total bytes copied across successful tasks
    pub fn bytes_copied(&self) -> u64 {
        self.results.iter().map(|r| r.bytes_copied()).sum()
    }

    /// Throughput in bytes/second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes_copied() as f64 / secs
        } else {
            0.0
        }
    }
}
