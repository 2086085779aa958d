//! Strategy benchmark harness
//!
//! Runs a batch of copy tasks through one strategy and records timing and
//! per-task outcomes. Copy failures never escape a run: every task ends up
//! as exactly one [`TaskResult`], stored in input order.

use crate::config::{ExecutionConfig, ExecutionMode};
use crate::core::{AsyncCopyStrategy, BenchmarkRun, CopyStrategy, CopyTask, TaskResult};
use crate::error::{BenchError, Result};
use async_trait::async_trait;
use chrono::Utc;
use crossbeam::channel::{bounded, unbounded};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Executes strategies over task batches and measures them
#[derive(Debug, Clone, Default)]
pub struct BenchmarkHarness {
    /// Runtime used by [`BenchmarkHarness::run`] for async mode
    runtime: Option<tokio::runtime::Handle>,
}

impl BenchmarkHarness {
    /// Create a harness without async support
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a harness that can dispatch async runs.
    ///
    /// The handle must belong to a multi-thread runtime, since `run` blocks
    /// on it from the calling thread.
    pub fn with_runtime(handle: tokio::runtime::Handle) -> Self {
        Self {
            runtime: Some(handle),
        }
    }

    /// Run a batch in the mode described by `exec`.
    ///
    /// Only fails when async mode is requested without a runtime; copy
    /// failures are reported inside the returned run.
    pub fn run(
        &self,
        strategy: &Arc<dyn CopyStrategy>,
        tasks: &[CopyTask],
        exec: &ExecutionConfig,
    ) -> Result<BenchmarkRun> {
        match exec.mode {
            ExecutionMode::Sequential => Ok(self.run_sequential(strategy.as_ref(), tasks)),
            ExecutionMode::Concurrent => {
                Ok(self.run_concurrent(strategy.as_ref(), tasks, exec.max_parallelism))
            }
            ExecutionMode::Async => {
                let handle = self.runtime.as_ref().ok_or_else(|| {
                    BenchError::Runtime("async mode requires a tokio runtime".to_string())
                })?;
                Ok(handle.block_on(self.run_async(strategy, tasks, exec.max_parallelism)))
            }
        }
    }

    /// Invoke the strategy once per task, in order, on the calling thread
    pub fn run_sequential(&self, strategy: &dyn CopyStrategy, tasks: &[CopyTask]) -> BenchmarkRun {
        tracing::debug!(
            "Running '{}' sequentially over {} tasks",
            strategy.name(),
            tasks.len()
        );

        let started_at = Utc::now();
        let start = Instant::now();

        let results: Vec<TaskResult> = tasks
            .iter()
            .enumerate()
            .map(|(index, task)| invoke(strategy, index, task))
            .collect();

        let run = BenchmarkRun::new(
            strategy.name(),
            ExecutionMode::Sequential,
            1,
            results,
            started_at,
            start.elapsed(),
        );
        log_finished(&run);
        run
    }

    /// Invoke the strategy for every task concurrently and wait for all.
    ///
    /// `max_parallelism == 0` spawns one thread per task, released together
    /// once all are spawned. Any other value runs the batch on a fixed pool
    /// of that many threads. Results keep input order.
    ///
    /// Tasks sharing a destination path are not serialized: the final file
    /// content is whichever writer finishes last, or an interleaving.
    pub fn run_concurrent(
        &self,
        strategy: &dyn CopyStrategy,
        tasks: &[CopyTask],
        max_parallelism: usize,
    ) -> BenchmarkRun {
        let exec = ExecutionConfig::concurrent(max_parallelism);
        let units = exec.effective_parallelism(tasks.len());

        tracing::debug!(
            "Running '{}' concurrently over {} tasks ({} units)",
            strategy.name(),
            tasks.len(),
            units
        );

        let started_at = Utc::now();
        let (results, duration) = if tasks.is_empty() {
            (Vec::new(), Duration::ZERO)
        } else if max_parallelism == 0 {
            run_thread_per_task(strategy, tasks)
        } else {
            run_pooled(strategy, tasks, units)
        };

        let run = BenchmarkRun::new(
            strategy.name(),
            ExecutionMode::Concurrent,
            max_parallelism,
            results,
            started_at,
            duration,
        );
        log_finished(&run);
        run
    }

    /// Invoke the strategy for every task as a tokio task and wait for all.
    ///
    /// Blocking strategies without a native async form run on the blocking
    /// pool. `max_parallelism >= 1` bounds in-flight copies with a
    /// semaphore. Join handles are awaited in input order.
    pub async fn run_async(
        &self,
        strategy: &Arc<dyn CopyStrategy>,
        tasks: &[CopyTask],
        max_parallelism: usize,
    ) -> BenchmarkRun {
        let async_strategy: Arc<dyn AsyncCopyStrategy> = match strategy.as_async() {
            Some(native) => native,
            None => Arc::new(SpawnBlocking(Arc::clone(strategy))),
        };
        // At most one permit per task
        let units =
            ExecutionConfig::asynchronous(max_parallelism).effective_parallelism(tasks.len());
        let semaphore = (max_parallelism > 0).then(|| Arc::new(Semaphore::new(units.max(1))));

        tracing::debug!(
            "Running '{}' as async tasks over {} tasks ({} units)",
            strategy.name(),
            tasks.len(),
            units
        );

        let started_at = Utc::now();
        let start = Instant::now();

        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let strategy = Arc::clone(&async_strategy);
            let semaphore = semaphore.clone();
            let task = task.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(e) => {
                            return (Err(BenchError::Runtime(e.to_string())), Duration::ZERO)
                        }
                    },
                    None => None,
                };

                let begin = Instant::now();
                let result = strategy.copy(&task.source, &task.destination).await;
                (result, begin.elapsed())
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (index, (task, handle)) in tasks.iter().zip(handles).enumerate() {
            let (result, duration) = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => (
                    Err(BenchError::StrategyPanicked(e.to_string())),
                    Duration::ZERO,
                ),
            };
            results.push(record(strategy.name(), index, task, result, duration));
        }

        let run = BenchmarkRun::new(
            strategy.name(),
            ExecutionMode::Async,
            max_parallelism,
            results,
            started_at,
            start.elapsed(),
        );
        log_finished(&run);
        run
    }
}

/// One scoped thread per task, all gated on a shared start signal
fn run_thread_per_task(
    strategy: &dyn CopyStrategy,
    tasks: &[CopyTask],
) -> (Vec<TaskResult>, Duration) {
    let mut slots: Vec<Option<TaskResult>> = tasks.iter().map(|_| None).collect();
    let (result_tx, result_rx) = unbounded::<TaskResult>();
    let (start_tx, start_rx) = bounded::<()>(0);

    let duration = thread::scope(|scope| {
        for (index, task) in tasks.iter().enumerate() {
            let result_tx = result_tx.clone();
            let start_rx = start_rx.clone();

            let spawned = thread::Builder::new()
                .name(format!("copybench-{}", index))
                .spawn_scoped(scope, move || {
                    // Disconnect is the start signal
                    let _ = start_rx.recv();
                    let _ = result_tx.send(invoke(strategy, index, task));
                });

            if let Err(e) = spawned {
                slots[index] = Some(record(
                    strategy.name(),
                    index,
                    task,
                    Err(BenchError::ThreadPool(format!("failed to spawn thread: {}", e))),
                    Duration::ZERO,
                ));
            }
        }
        drop(result_tx);

        let start = Instant::now();
        drop(start_tx);

        for result in result_rx.iter() {
            let index = result.index;
            slots[index] = Some(result);
        }
        start.elapsed()
    });

    let results = slots.into_iter().flatten().collect();
    (results, duration)
}

/// Fixed-size rayon pool; `collect` on an indexed iterator keeps input order
fn run_pooled(
    strategy: &dyn CopyStrategy,
    tasks: &[CopyTask],
    threads: usize,
) -> (Vec<TaskResult>, Duration) {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("copybench-pool-{}", i))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            let message = e.to_string();
            let results = tasks
                .iter()
                .enumerate()
                .map(|(index, task)| {
                    record(
                        strategy.name(),
                        index,
                        task,
                        Err(BenchError::ThreadPool(message.clone())),
                        Duration::ZERO,
                    )
                })
                .collect();
            return (results, Duration::ZERO);
        }
    };

    let start = Instant::now();
    let results: Vec<TaskResult> = pool.install(|| {
        tasks
            .par_iter()
            .enumerate()
            .map(|(index, task)| invoke(strategy, index, task))
            .collect()
    });
    (results, start.elapsed())
}

/// Invoke a strategy for one task, capturing errors and panics
fn invoke(strategy: &dyn CopyStrategy, index: usize, task: &CopyTask) -> TaskResult {
    let start = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        strategy.copy(&task.source, &task.destination)
    }))
    .unwrap_or_else(|payload| Err(BenchError::StrategyPanicked(panic_message(payload.as_ref()))));

    record(strategy.name(), index, task, result, start.elapsed())
}

fn record(
    strategy: &str,
    index: usize,
    task: &CopyTask,
    result: Result<u64>,
    duration: Duration,
) -> TaskResult {
    match &result {
        Ok(bytes) => tracing::trace!(
            "[{}] task {} copied {} bytes in {:?}",
            strategy,
            index,
            bytes,
            duration
        ),
        Err(e) => tracing::warn!(
            "[{}] task {} ({:?} -> {:?}) failed: {}",
            strategy,
            index,
            task.source,
            task.destination,
            e
        ),
    }

    TaskResult::from_strategy(index, task.clone(), result, duration)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_finished(run: &BenchmarkRun) {
    tracing::debug!(
        "'{}' ({}) finished in {:?}: {} ok, {} failed",
        run.strategy(),
        run.mode(),
        run.duration(),
        run.succeeded(),
        run.failed()
    );
}

/// Runs a blocking strategy on tokio's blocking pool
struct SpawnBlocking(Arc<dyn CopyStrategy>);

#[async_trait]
impl AsyncCopyStrategy for SpawnBlocking {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn copy(&self, source: &Path, dest: &Path) -> Result<u64> {
        let strategy = Arc::clone(&self.0);
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || strategy.copy(&source, &dest))
            .await
            .map_err(|e| BenchError::StrategyPanicked(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FnStrategy;
    use proptest::prelude::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, size: usize) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();
        path
    }

    fn std_copy() -> Arc<dyn CopyStrategy> {
        Arc::new(FnStrategy::new("std-copy", |src: &Path, dst: &Path| {
            std::fs::copy(src, dst).map_err(|e| BenchError::io(src, e))
        }))
    }

    /// Three sources of 50/75/100 KiB plus tasks into `prefix_<i>.bin`
    fn scenario(dir: &Path, prefix: &str) -> Vec<CopyTask> {
        [50, 75, 100]
            .iter()
            .enumerate()
            .map(|(i, kb)| {
                let src = dir.join(format!("source_{}.bin", i));
                if !src.exists() {
                    create_test_file(dir, &format!("source_{}.bin", i), kb * 1024);
                }
                CopyTask::new(src, dir.join(format!("{}_{}.bin", prefix, i))).unwrap()
            })
            .collect()
    }

    fn assert_copies_match(run: &BenchmarkRun) {
        for result in run.results() {
            if result.is_success() {
                let src = std::fs::read(&result.task.source).unwrap();
                let dst = std::fs::read(&result.task.destination).unwrap();
                assert_eq!(src, dst);
                assert_eq!(result.bytes_copied(), src.len() as u64);
            }
        }
    }

    fn outcomes(run: &BenchmarkRun) -> Vec<bool> {
        run.results().iter().map(|r| r.is_success()).collect()
    }

    #[test]
    fn test_sequential_copies_all() {
        let dir = TempDir::new().unwrap();
        let tasks = scenario(dir.path(), "seq");

        let run = BenchmarkHarness::new().run_sequential(std_copy().as_ref(), &tasks);

        assert_eq!(run.strategy(), "std-copy");
        assert_eq!(run.mode(), ExecutionMode::Sequential);
        assert_eq!(run.results().len(), 3);
        assert!(run.is_success());
        assert_eq!(run.bytes_copied(), (50 + 75 + 100) * 1024);
        assert_copies_match(&run);
    }

    #[test]
    fn test_unbounded_concurrent_scenario() {
        let dir = TempDir::new().unwrap();
        let tasks = scenario(dir.path(), "copy");

        let run = BenchmarkHarness::new().run_concurrent(std_copy().as_ref(), &tasks, 0);

        assert_eq!(run.mode(), ExecutionMode::Concurrent);
        assert_eq!(run.succeeded(), 3);
        for (result, task) in run.results().iter().zip(&tasks) {
            assert_eq!(&result.task, task);
            assert!(task.destination.exists());
        }
        assert_copies_match(&run);
    }

    #[test]
    fn test_missing_source_is_captured() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.txt");
        let tasks = vec![CopyTask::new(dir.path().join("missing.txt"), &out).unwrap()];

        let harness = BenchmarkHarness::new();
        for run in [
            harness.run_sequential(std_copy().as_ref(), &tasks),
            harness.run_concurrent(std_copy().as_ref(), &tasks, 0),
            harness.run_concurrent(std_copy().as_ref(), &tasks, 2),
        ] {
            assert_eq!(run.results().len(), 1);
            let err = run.results()[0].error().expect("task should fail");
            assert_eq!(err.task, tasks[0]);
            assert!(err.cause.is_not_found());
            assert!(!out.exists());
        }
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        let mut tasks = scenario(dir.path(), "mixed");
        tasks.insert(
            1,
            CopyTask::new(dir.path().join("nope.bin"), dir.path().join("nope_out.bin")).unwrap(),
        );

        let harness = BenchmarkHarness::new();
        let seq = harness.run_sequential(std_copy().as_ref(), &tasks);
        let conc = harness.run_concurrent(std_copy().as_ref(), &tasks, 0);
        let pooled = harness.run_concurrent(std_copy().as_ref(), &tasks, 2);

        let expected = vec![true, false, true, true];
        assert_eq!(outcomes(&seq), expected);
        assert_eq!(outcomes(&conc), expected);
        assert_eq!(outcomes(&pooled), expected);
        assert_eq!(seq.failed(), 1);
    }

    #[test]
    fn test_single_worker_matches_sequential() {
        let dir = TempDir::new().unwrap();
        let mut tasks = scenario(dir.path(), "one");
        tasks.push(
            CopyTask::new(dir.path().join("absent.bin"), dir.path().join("absent_out.bin"))
                .unwrap(),
        );

        let harness = BenchmarkHarness::new();
        let seq = harness.run_sequential(std_copy().as_ref(), &tasks);
        let pooled = harness.run_concurrent(std_copy().as_ref(), &tasks, 1);

        assert_eq!(outcomes(&seq), outcomes(&pooled));
        assert_eq!(pooled.max_parallelism(), 1);
        assert_copies_match(&pooled);
    }

    #[test]
    fn test_panicking_strategy_is_captured() {
        let strategy = FnStrategy::new("explodes", |src: &Path, _: &Path| {
            if src.ends_with("bad") {
                panic!("boom");
            }
            Ok(1)
        });
        let tasks = vec![
            CopyTask::new("/tmp/good", "/tmp/x").unwrap(),
            CopyTask::new("/tmp/bad", "/tmp/y").unwrap(),
            CopyTask::new("/tmp/good2", "/tmp/z").unwrap(),
        ];

        let harness = BenchmarkHarness::new();
        for run in [
            harness.run_sequential(&strategy, &tasks),
            harness.run_concurrent(&strategy, &tasks, 0),
            harness.run_concurrent(&strategy, &tasks, 2),
        ] {
            assert_eq!(outcomes(&run), vec![true, false, true]);
            let err = run.results()[1].error().unwrap();
            assert!(matches!(&err.cause, BenchError::StrategyPanicked(msg) if msg == "boom"));
        }
    }

    #[test]
    fn test_empty_batch() {
        let harness = BenchmarkHarness::new();
        let run = harness.run_concurrent(std_copy().as_ref(), &[], 0);
        assert!(run.results().is_empty());
        assert!(run.is_success());
        assert_eq!(run.duration(), Duration::ZERO);
    }

    #[test]
    fn test_async_run_preserves_order() {
        let dir = TempDir::new().unwrap();
        let mut tasks = scenario(dir.path(), "async");
        tasks.push(
            CopyTask::new(dir.path().join("gone.bin"), dir.path().join("gone_out.bin")).unwrap(),
        );

        let harness = BenchmarkHarness::new();
        let strategy = std_copy();
        let run = tokio_test::block_on(harness.run_async(&strategy, &tasks, 2));

        assert_eq!(run.mode(), ExecutionMode::Async);
        assert_eq!(outcomes(&run), vec![true, true, true, false]);
        for (result, task) in run.results().iter().zip(&tasks) {
            assert_eq!(&result.task, task);
        }
        assert_copies_match(&run);
    }

    #[test]
    fn test_async_huge_bound_is_clamped() {
        let dir = TempDir::new().unwrap();
        let tasks = scenario(dir.path(), "huge");
        let strategy = std_copy();
        let harness = BenchmarkHarness::new();

        let run = tokio_test::block_on(harness.run_async(&strategy, &tasks, usize::MAX));
        assert_eq!(run.max_parallelism(), usize::MAX);
        assert!(run.is_success());
        assert_copies_match(&run);

        let empty = tokio_test::block_on(harness.run_async(&strategy, &[], 4));
        assert!(empty.results().is_empty());

        let pooled = harness.run_concurrent(strategy.as_ref(), &tasks, usize::MAX);
        assert!(pooled.is_success());
    }

    /// Strategy that records the highest number of copies in flight at once
    fn peak_tracker() -> (Arc<dyn CopyStrategy>, Arc<AtomicUsize>) {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&in_flight);
        let max_seen = Arc::clone(&peak);
        let strategy: Arc<dyn CopyStrategy> =
            Arc::new(FnStrategy::new("peak", move |_: &Path, _: &Path| {
                let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(40));
                counter.fetch_sub(1, Ordering::SeqCst);
                Ok(0)
            }));

        (strategy, peak)
    }

    fn peak_tasks() -> Vec<CopyTask> {
        (0..8)
            .map(|i| CopyTask::new(format!("in-{}", i), format!("out-{}", i)).unwrap())
            .collect()
    }

    #[test]
    fn test_concurrent_respects_parallelism_bound() {
        let tasks = peak_tasks();
        let harness = BenchmarkHarness::new();

        for (limit, expected) in [(0, 8), (3, 3), (1, 1)] {
            let (strategy, peak) = peak_tracker();
            let run = harness.run_concurrent(strategy.as_ref(), &tasks, limit);

            assert!(run.is_success());
            assert_eq!(peak.load(Ordering::SeqCst), expected, "limit {}", limit);
        }
    }

    #[test]
    fn test_async_respects_parallelism_bound() {
        let tasks = peak_tasks();
        let harness = BenchmarkHarness::new();

        for (limit, expected) in [(0, 8), (3, 3), (1, 1)] {
            let (strategy, peak) = peak_tracker();
            let run = tokio_test::block_on(harness.run_async(&strategy, &tasks, limit));

            assert!(run.is_success());
            assert_eq!(peak.load(Ordering::SeqCst), expected, "limit {}", limit);
        }
    }

    #[test]
    fn test_run_dispatch() {
        let dir = TempDir::new().unwrap();
        let tasks = scenario(dir.path(), "dispatch");
        let strategy = std_copy();

        let harness = BenchmarkHarness::new();
        let run = harness
            .run(&strategy, &tasks, &ExecutionConfig::concurrent(2))
            .unwrap();
        assert_eq!(run.mode(), ExecutionMode::Concurrent);
        assert!(run.is_success());

        let err = harness
            .run(&strategy, &tasks, &ExecutionConfig::asynchronous(0))
            .unwrap_err();
        assert!(matches!(err, BenchError::Runtime(_)));

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let harness = BenchmarkHarness::with_runtime(runtime.handle().clone());
        let run = harness
            .run(&strategy, &tasks, &ExecutionConfig::asynchronous(0))
            .unwrap();
        assert_eq!(run.mode(), ExecutionMode::Async);
        assert!(run.is_success());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_results_follow_input_order(
            failures in proptest::collection::vec(any::<bool>(), 0..24),
            limit in 0usize..6,
        ) {
            // Later tasks finish first so completion order differs from input order
            let strategy = FnStrategy::new("flaky", |src: &Path, _: &Path| {
                let name = src.to_string_lossy();
                let index: u64 = name.trim_start_matches("fail-").trim_start_matches("ok-").parse().unwrap();
                thread::sleep(Duration::from_micros(200u64.saturating_sub(index * 8)));
                if name.starts_with("fail-") {
                    Err(BenchError::NotFound(src.to_path_buf()))
                } else {
                    Ok(index)
                }
            });

            let tasks: Vec<CopyTask> = failures
                .iter()
                .enumerate()
                .map(|(i, fail)| {
                    let src = if *fail { format!("fail-{}", i) } else { format!("ok-{}", i) };
                    CopyTask::new(src, format!("out-{}", i)).unwrap()
                })
                .collect();

            let harness = BenchmarkHarness::new();
            let seq = harness.run_sequential(&strategy, &tasks);
            let conc = harness.run_concurrent(&strategy, &tasks, limit);

            for run in [&seq, &conc] {
                prop_assert_eq!(run.results().len(), tasks.len());
                for (i, result) in run.results().iter().enumerate() {
                    prop_assert_eq!(result.index, i);
                    prop_assert_eq!(&result.task, &tasks[i]);
                    prop_assert_eq!(result.is_success(), !failures[i]);
                }
            }
        }
    }
}
