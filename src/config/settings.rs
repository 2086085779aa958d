//! Configuration settings for CopyBench
//!
//! Defines CLI arguments, execution modes and the runtime benchmark
//! configuration derived from them.

use crate::error::{BenchError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Built-in strategy names, in default run order
pub const BUILTIN_STRATEGIES: &[&str] = &["buffered", "zero-copy", "std-copy", "mmap", "async"];

/// CopyBench - compare file-copy strategies sequentially and in parallel
#[derive(Parser, Debug, Clone)]
#[command(name = "copybench")]
#[command(author = "CopyBench Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark interchangeable file-copy strategies")]
#[command(long_about = r#"
CopyBench creates a set of test files, copies them with several copy
strategies and times each strategy sequentially and concurrently.

Strategies:
  buffered    read/write loop through a fixed buffer
  zero-copy   kernel-side transfer (copy_file_range on Linux)
  std-copy    std::fs::copy whole-file helper
  mmap        memory-mapped source and destination
  async       tokio file copy

Examples:
  copybench run                                   # All strategies, default sizes
  copybench run --sizes 1M,10M --mode concurrent  # Concurrent runs only
  copybench run --strategy buffered --max-parallelism 2
  copybench run --format json > results.json
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate test files and benchmark the selected strategies
    #[command(name = "run")]
    Run(RunArgs),

    /// List built-in strategies
    #[command(name = "strategies")]
    Strategies,
}

/// Arguments for the `run` subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Working directory for test files (defaults to a fresh temp directory)
    #[arg(short = 'd', long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Comma-separated test file sizes (e.g. 50K,75K,100K)
    #[arg(short = 's', long, default_value = "50K,75K,100K", value_name = "SIZES")]
    pub sizes: String,

    /// Strategy to run (repeatable, default: all built-ins)
    #[arg(long = "strategy", value_name = "NAME")]
    pub strategies: Vec<String>,

    /// Execution mode to run (repeatable, default: sequential and concurrent)
    #[arg(short = 'm', long = "mode", value_enum, value_name = "MODE")]
    pub modes: Vec<ExecutionMode>,

    /// Maximum concurrent copies (0 = one per file)
    #[arg(short = 'p', long, default_value = "0", value_name = "NUM")]
    pub max_parallelism: usize,

    /// Buffer size for the buffered strategy (e.g. 1K, 64K)
    #[arg(short = 'b', long, default_value = "1K", value_name = "SIZE")]
    pub buffer_size: String,

    /// Output format for results
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Keep test and output files after the run
    #[arg(long)]
    pub keep: bool,
}

/// How a batch of tasks is executed
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One task after another on the calling thread
    #[default]
    Sequential,
    /// Threads: one per task, or a fixed pool when bounded
    Concurrent,
    /// Tokio tasks, optionally bounded by a semaphore
    Async,
}

impl ExecutionMode {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
            Self::Async => "async",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Execution mode plus parallelism bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExecutionConfig {
    /// Execution mode
    pub mode: ExecutionMode,
    /// Maximum concurrent units (0 = one per task). Ignored when sequential.
    pub max_parallelism: usize,
}

impl ExecutionConfig {
    /// Sequential execution
    pub fn sequential() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            max_parallelism: 0,
        }
    }

    /// Thread-based concurrent execution
    pub fn concurrent(max_parallelism: usize) -> Self {
        Self {
            mode: ExecutionMode::Concurrent,
            max_parallelism,
        }
    }

    /// Tokio-based concurrent execution
    pub fn asynchronous(max_parallelism: usize) -> Self {
        Self {
            mode: ExecutionMode::Async,
            max_parallelism,
        }
    }

    /// Effective number of concurrent units for a batch
    pub fn effective_parallelism(&self, task_count: usize) -> usize {
        match self.mode {
            ExecutionMode::Sequential => 1,
            _ if self.max_parallelism == 0 => task_count,
            _ => self.max_parallelism.min(task_count),
        }
    }
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Working directory (None = temp directory)
    pub work_dir: Option<PathBuf>,
    /// Test file sizes in bytes
    pub file_sizes: Vec<u64>,
    /// Strategies to run, in order
    pub strategies: Vec<String>,
    /// Execution modes to run, in order
    pub modes: Vec<ExecutionMode>,
    /// Parallelism bound for concurrent and async modes
    pub max_parallelism: usize,
    /// Buffer size for the buffered strategy
    pub buffer_size: usize,
    /// Output format
    pub format: OutputFormat,
    /// Keep files after the run
    pub keep_files: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            file_sizes: vec![50 * 1024, 75 * 1024, 100 * 1024],
            strategies: BUILTIN_STRATEGIES.iter().map(|s| s.to_string()).collect(),
            modes: vec![ExecutionMode::Sequential, ExecutionMode::Concurrent],
            max_parallelism: 0,
            buffer_size: 1024,
            format: OutputFormat::Text,
            keep_files: false,
        }
    }
}

impl BenchConfig {
    /// Create config from `run` arguments
    pub fn from_cli(args: &RunArgs) -> Result<Self> {
        let mut config = Self::default();

        config.work_dir = args.dir.clone();
        config.file_sizes = parse_size_list(&args.sizes)
            .map_err(|e| BenchError::config(format!("Invalid sizes: {}", e)))?;

        if !args.strategies.is_empty() {
            for name in &args.strategies {
                if !BUILTIN_STRATEGIES.contains(&name.as_str()) {
                    return Err(BenchError::UnknownStrategy(name.clone()));
                }
            }
            config.strategies = dedup_in_order(&args.strategies);
        }

        if !args.modes.is_empty() {
            config.modes = dedup_in_order(&args.modes);
        }

        config.max_parallelism = args.max_parallelism;

        let buffer_size = parse_size(&args.buffer_size)
            .map_err(|e| BenchError::config(format!("Invalid buffer size: {}", e)))?;
        if buffer_size == 0 {
            return Err(BenchError::config("Buffer size must be at least 1 byte"));
        }
        config.buffer_size = buffer_size as usize;

        config.format = args.format;
        config.keep_files = args.keep;

        Ok(config)
    }

    /// Execution configs for every selected mode
    pub fn execution_configs(&self) -> Vec<ExecutionConfig> {
        self.modes
            .iter()
            .map(|mode| ExecutionConfig {
                mode: *mode,
                max_parallelism: self.max_parallelism,
            })
            .collect()
    }
}

/// First occurrence of every value, in the order given
fn dedup_in_order<T: Clone + PartialEq>(values: &[T]) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(value) {
            unique.push(value.clone());
        }
    }
    unique
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("GB") || size.ends_with('G') {
        let num = size.trim_end_matches(|c| c == 'G' || c == 'B');
        (num, 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        let num = size.trim_end_matches(|c| c == 'M' || c == 'B');
        (num, 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        let num = size.trim_end_matches(|c| c == 'K' || c == 'B');
        (num, 1024u64)
    } else if size.ends_with('B') {
        let num = size.trim_end_matches('B');
        (num, 1u64)
    } else {
        // Assume bytes if no suffix
        (size.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    if !num.is_finite() {
        return Err(format!("Invalid number: {}", num_str));
    }
    if num < 0.0 {
        return Err(format!("Negative size: {}", num_str));
    }

    let bytes = num * multiplier as f64;
    // u64::MAX rounds up to 2^64 as f64
    if bytes >= u64::MAX as f64 {
        return Err(format!("Size too large: {}", size));
    }

    Ok(bytes as u64)
}

/// Parse a comma-separated list of sizes
pub fn parse_size_list(sizes: &str) -> std::result::Result<Vec<u64>, String> {
    let parsed = sizes
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_size)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if parsed.is_empty() {
        return Err("At least one size is required".to_string());
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["copybench", "run"];
        argv.extend_from_slice(extra);
        match CliArgs::parse_from(argv).command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("50KB").unwrap(), 50 * 1024);
        assert_eq!(parse_size("1M").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("1.5M").unwrap(), (1.5 * 1024.0 * 1024.0) as u64);
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("-1K").is_err());
        assert!(parse_size("inf").is_err());
        assert!(parse_size("infinity").is_err());
        assert!(parse_size("NaN").is_err());
        assert!(parse_size("1e30K").is_err());
        assert!(parse_size("17179869184G").is_err());
        assert_eq!(
            parse_size("17179869183G").unwrap(),
            17179869183u64 * 1024 * 1024 * 1024
        );
    }

    #[test]
    fn test_parse_size_list() {
        assert_eq!(
            parse_size_list("50K, 75K,100K").unwrap(),
            vec![50 * 1024, 75 * 1024, 100 * 1024]
        );
        assert!(parse_size_list(" , ").is_err());
    }

    #[test]
    fn test_from_cli_defaults() {
        let config = BenchConfig::from_cli(&run_args(&[])).unwrap();
        assert_eq!(config.file_sizes, vec![50 * 1024, 75 * 1024, 100 * 1024]);
        assert_eq!(config.strategies.len(), BUILTIN_STRATEGIES.len());
        assert_eq!(
            config.modes,
            vec![ExecutionMode::Sequential, ExecutionMode::Concurrent]
        );
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.max_parallelism, 0);
    }

    #[test]
    fn test_from_cli_overrides() {
        let args = run_args(&[
            "--strategy",
            "mmap",
            "--mode",
            "async",
            "--max-parallelism",
            "2",
            "--buffer-size",
            "64K",
            "--format",
            "json",
        ]);
        let config = BenchConfig::from_cli(&args).unwrap();
        assert_eq!(config.strategies, vec!["mmap".to_string()]);
        assert_eq!(config.modes, vec![ExecutionMode::Async]);
        assert_eq!(config.buffer_size, 64 * 1024);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(
            config.execution_configs(),
            vec![ExecutionConfig::asynchronous(2)]
        );
    }

    #[test]
    fn test_from_cli_drops_repeated_values() {
        let args = run_args(&[
            "--mode",
            "sequential",
            "--mode",
            "concurrent",
            "--mode",
            "sequential",
            "--strategy",
            "mmap",
            "--strategy",
            "buffered",
            "--strategy",
            "mmap",
        ]);
        let config = BenchConfig::from_cli(&args).unwrap();
        assert_eq!(
            config.modes,
            vec![ExecutionMode::Sequential, ExecutionMode::Concurrent]
        );
        assert_eq!(
            config.strategies,
            vec!["mmap".to_string(), "buffered".to_string()]
        );
    }

    #[test]
    fn test_from_cli_rejects_unknown_strategy() {
        let args = run_args(&["--strategy", "teleport"]);
        assert!(matches!(
            BenchConfig::from_cli(&args),
            Err(BenchError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_effective_parallelism() {
        assert_eq!(ExecutionConfig::sequential().effective_parallelism(5), 1);
        assert_eq!(ExecutionConfig::concurrent(0).effective_parallelism(5), 5);
        assert_eq!(ExecutionConfig::concurrent(2).effective_parallelism(5), 2);
        assert_eq!(ExecutionConfig::concurrent(8).effective_parallelism(5), 5);
    }
}
