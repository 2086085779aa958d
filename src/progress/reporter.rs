//! Run-level progress reporter
//!
//! Uses indicatif to show:
//! - Finished runs out of the planned total
//! - The strategy/mode currently executing
//! - Task failures accumulated so far

use crate::core::BenchmarkRun;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress reporter for a benchmark session
pub struct ProgressReporter {
    /// Multi-progress container
    multi: MultiProgress,
    /// Runs progress bar
    runs_bar: ProgressBar,
    /// Current status message
    status: ProgressBar,
    /// Start time
    start_time: Instant,
    /// Runs finished so far
    runs_finished: AtomicU64,
    /// Task failures seen so far
    tasks_failed: AtomicU64,
    /// Is progress enabled
    enabled: AtomicBool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let status = multi.add(ProgressBar::new_spinner());
        status.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        status.enable_steady_tick(Duration::from_millis(100));

        let runs_bar = multi.add(ProgressBar::new(0));
        runs_bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} runs ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        runs_bar.set_prefix("Runs");

        Self {
            multi,
            runs_bar,
            status,
            start_time: Instant::now(),
            runs_finished: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a disabled progress reporter (for quiet or non-TTY output)
    pub fn disabled() -> Self {
        let reporter = Self::new();
        reporter.enabled.store(false, Ordering::SeqCst);
        reporter.status.disable_steady_tick();
        reporter.multi.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Set how many runs the session will execute
    pub fn set_total_runs(&self, total: u64) {
        self.runs_bar.set_length(total);
    }

    /// Announce the run about to start
    pub fn start_run(&self, strategy: &str, label: &str) {
        self.status
            .set_message(format!("Running {} ({})", strategy, label));
    }

    /// Record a finished run
    pub fn finish_run(&self, run: &BenchmarkRun) {
        self.runs_finished.fetch_add(1, Ordering::Relaxed);
        self.tasks_failed
            .fetch_add(run.failed() as u64, Ordering::Relaxed);
        self.runs_bar.inc(1);

        if !run.is_success() {
            self.status.println(format!(
                "✗ {} ({}): {} of {} tasks failed",
                run.strategy(),
                run.mode(),
                run.failed(),
                run.results().len()
            ));
        }
    }

    /// Finish all bars
    pub fn finish(&self) {
        let failed = self.tasks_failed.load(Ordering::Relaxed);
        let message = if failed == 0 {
            format!("✓ {} runs finished", self.runs_finished())
        } else {
            format!(
                "✗ {} runs finished, {} task failures",
                self.runs_finished(),
                failed
            )
        };
        self.status.finish_with_message(message);
        self.runs_bar.finish();
    }

    /// Runs finished so far
    pub fn runs_finished(&self) -> u64 {
        self.runs_finished.load(Ordering::Relaxed)
    }

    /// Task failures seen so far
    pub fn tasks_failed(&self) -> u64 {
        self.tasks_failed.load(Ordering::Relaxed)
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check if progress is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
