//! Benchmark reporting
//!
//! Turns finished runs into a text table or JSON, and compares runs of
//! the same strategy across execution modes.

use crate::config::ExecutionMode;
use crate::core::BenchmarkRun;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;

/// Serializable view of one task outcome
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    /// Source path
    pub source: String,
    /// Destination path
    pub destination: String,
    /// Whether the copy succeeded
    pub ok: bool,
    /// Bytes copied
    pub bytes: u64,
    /// Time spent in the strategy, in milliseconds
    pub duration_ms: f64,
    /// Error message for failed tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serializable view of one benchmark run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Strategy name
    pub strategy: String,
    /// Execution mode
    pub mode: ExecutionMode,
    /// Parallelism bound (0 = one unit per task)
    pub max_parallelism: usize,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// End timestamp
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: f64,
    /// Successful tasks
    pub succeeded: usize,
    /// Failed tasks
    pub failed: usize,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Throughput in bytes/second
    pub throughput: f64,
    /// Per-task outcomes in input order
    pub tasks: Vec<TaskRecord>,
}

impl From<&BenchmarkRun> for RunReport {
    fn from(run: &BenchmarkRun) -> Self {
        let tasks = run
            .results()
            .iter()
            .map(|result| TaskRecord {
                source: result.task.source.display().to_string(),
                destination: result.task.destination.display().to_string(),
                ok: result.is_success(),
                bytes: result.bytes_copied(),
                duration_ms: result
                    .outcome
                    .as_ref()
                    .map(|s| millis(s.duration))
                    .unwrap_or(0.0),
                error: result.error().map(|e| e.cause.to_string()),
            })
            .collect();

        Self {
            strategy: run.strategy().to_string(),
            mode: run.mode(),
            max_parallelism: run.max_parallelism(),
            started_at: run.started_at(),
            finished_at: run.finished_at(),
            duration_ms: millis(run.duration()),
            succeeded: run.succeeded(),
            failed: run.failed(),
            bytes_copied: run.bytes_copied(),
            throughput: run.throughput(),
            tasks,
        }
    }
}

/// Sequential vs concurrent timing of one strategy
#[derive(Debug, Clone, Serialize)]
pub struct Speedup {
    /// Strategy name
    pub strategy: String,
    /// Mode compared against sequential
    pub mode: ExecutionMode,
    /// Sequential duration divided by the other mode's duration
    pub ratio: f64,
}

/// Cross-run summary
#[derive(Debug, Clone, Serialize, Default)]
pub struct Comparison {
    /// Fastest strategy per mode, with its duration in milliseconds
    pub fastest: Vec<(ExecutionMode, String, f64)>,
    /// Speedup of each non-sequential run over the sequential run
    pub speedups: Vec<Speedup>,
}

impl Comparison {
    /// Compare fully successful runs; failed runs are left out
    pub fn from_runs(runs: &[BenchmarkRun]) -> Self {
        let ok: Vec<&BenchmarkRun> = runs.iter().filter(|r| r.is_success()).collect();
        let mut comparison = Comparison::default();

        for mode in [
            ExecutionMode::Sequential,
            ExecutionMode::Concurrent,
            ExecutionMode::Async,
        ] {
            if let Some(best) = ok
                .iter()
                .filter(|r| r.mode() == mode)
                .min_by_key(|r| r.duration())
            {
                comparison
                    .fastest
                    .push((mode, best.strategy().to_string(), millis(best.duration())));
            }
        }

        for run in ok.iter().filter(|r| r.mode() != ExecutionMode::Sequential) {
            let sequential = ok.iter().find(|r| {
                r.mode() == ExecutionMode::Sequential && r.strategy() == run.strategy()
            });

            if let Some(sequential) = sequential {
                let other = run.duration().as_secs_f64();
                if other > 0.0 {
                    comparison.speedups.push(Speedup {
                        strategy: run.strategy().to_string(),
                        mode: run.mode(),
                        ratio: sequential.duration().as_secs_f64() / other,
                    });
                }
            }
        }

        comparison
    }
}

/// JSON document emitted by `--format json`
#[derive(Debug, Serialize)]
struct JsonReport {
    runs: Vec<RunReport>,
    comparison: Comparison,
}

/// Render runs as pretty JSON
pub fn render_json(runs: &[BenchmarkRun]) -> Result<String> {
    let report = JsonReport {
        runs: runs.iter().map(RunReport::from).collect(),
        comparison: Comparison::from_runs(runs),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Render runs as a human-readable table
pub fn render_text(runs: &[BenchmarkRun]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n=== Copy Strategy Benchmark ===");
    let _ = writeln!(
        out,
        "{:<12} {:<11} {:>6} {:>7} {:>12} {:>14}",
        "Strategy", "Mode", "OK", "Failed", "Duration", "Throughput"
    );

    for run in runs {
        let _ = writeln!(
            out,
            "{:<12} {:<11} {:>6} {:>7} {:>12} {:>14}",
            run.strategy(),
            mode_label(run),
            run.succeeded(),
            run.failed(),
            format_duration(run.duration()),
            format!(
                "{}/s",
                humansize::format_size(run.throughput() as u64, humansize::BINARY)
            ),
        );
    }

    let failures: Vec<_> = runs
        .iter()
        .flat_map(|run| run.failures().map(move |e| (run, e)))
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "\nFailures:");
        for (run, error) in failures {
            let _ = writeln!(out, "  [{} / {}] {}", run.strategy(), run.mode(), error);
        }
    }

    let comparison = Comparison::from_runs(runs);
    if !comparison.fastest.is_empty() {
        let _ = writeln!(out, "\nFastest:");
        for (mode, strategy, ms) in &comparison.fastest {
            let _ = writeln!(out, "  {:<11} {} ({:.3} ms)", mode, strategy, ms);
        }
    }
    if !comparison.speedups.is_empty() {
        let _ = writeln!(out, "\nSpeedup over sequential:");
        for speedup in &comparison.speedups {
            let _ = writeln!(
                out,
                "  {:<12} {:<11} {:.2}x",
                speedup.strategy, speedup.mode, speedup.ratio
            );
        }
    }

    out
}

fn mode_label(run: &BenchmarkRun) -> String {
    match run.mode() {
        ExecutionMode::Sequential => run.mode().to_string(),
        _ if run.max_parallelism() == 0 => run.mode().to_string(),
        _ => format!("{}/{}", run.mode(), run.max_parallelism()),
    }
}

/// Format a duration, keeping sub-millisecond precision readable
fn format_duration(duration: Duration) -> String {
    if duration >= Duration::from_secs(1) {
        humantime::format_duration(Duration::from_millis(duration.as_millis() as u64)).to_string()
    } else {
        format!("{:.3} ms", millis(duration))
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
