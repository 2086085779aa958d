//! CopyBench CLI - File Copy Strategy Benchmark
//!
//! Generates test files, copies them with each selected strategy in each
//! selected execution mode, and prints timing results.

use clap::Parser;
use copybench::config::{
    BenchConfig, CliArgs, Commands, ExecutionConfig, OutputFormat, RunArgs, BUILTIN_STRATEGIES,
};
use copybench::core::{BenchmarkHarness, BenchmarkRun, StrategyRegistry};
use copybench::error::{BenchError, Result};
use copybench::fs::{builtin_strategies, StrategyOptions, Workload};
use copybench::progress::ProgressReporter;
use copybench::report::{render_json, render_text};
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging; RUST_LOG wins over -v
    let default_level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every task of every run succeeded
fn run(args: CliArgs) -> Result<bool> {
    match &args.command {
        Commands::Run(run_args) => cmd_run(run_args, &args),
        Commands::Strategies => {
            cmd_strategies();
            Ok(true)
        }
    }
}

fn cmd_run(run_args: &RunArgs, args: &CliArgs) -> Result<bool> {
    let config = BenchConfig::from_cli(run_args)?;

    if args.verbose > 0 {
        print_config(&config);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get().max(2))
        .enable_all()
        .build()
        .map_err(|e| BenchError::Runtime(e.to_string()))?;

    let options = StrategyOptions {
        buffer_size: config.buffer_size,
    };
    let strategies =
        builtin_strategies(&options, runtime.handle().clone())?.select(&config.strategies)?;
    let harness = BenchmarkHarness::with_runtime(runtime.handle().clone());
    let exec_configs = config.execution_configs();

    let workload = match &config.work_dir {
        Some(dir) => Workload::generate(dir, &config.file_sizes)?,
        None => Workload::in_temp_dir(&config.file_sizes)?,
    };
    tracing::info!(
        "Generated {} test files ({}) in {:?}",
        workload.sources().len(),
        humansize::format_size(workload.total_bytes(), humansize::BINARY),
        workload.dir()
    );

    let progress = if !args.quiet && console::Term::stderr().is_term() {
        ProgressReporter::new()
    } else {
        ProgressReporter::disabled()
    };
    progress.set_total_runs((strategies.len() * exec_configs.len()) as u64);

    // Clean up before propagating a failed run
    let outcome = run_all(&config, &harness, &strategies, &exec_configs, &workload, &progress);
    progress.finish();

    if config.keep_files {
        eprintln!("Test files kept in {}", workload.dir().display());
    } else if let Err(e) = workload.cleanup() {
        tracing::warn!("Failed to clean up test files: {}", e);
    }
    let runs = outcome?;

    match config.format {
        OutputFormat::Text => print!("{}", render_text(&runs)),
        OutputFormat::Json => println!("{}", render_json(&runs)?),
    }

    Ok(runs.iter().all(|run| run.is_success()))
}

fn run_all(
    config: &BenchConfig,
    harness: &BenchmarkHarness,
    strategies: &StrategyRegistry,
    exec_configs: &[ExecutionConfig],
    workload: &Workload,
    progress: &ProgressReporter,
) -> Result<Vec<BenchmarkRun>> {
    let mut runs = Vec::with_capacity(strategies.len() * exec_configs.len());
    for strategy in strategies.iter() {
        for exec in exec_configs {
            let label = format!("{}-{}", strategy.name(), exec.mode);
            let tasks = workload.tasks(&label)?;

            progress.start_run(strategy.name(), exec.mode.name());
            let run = harness.run(strategy, &tasks, exec)?;
            progress.finish_run(&run);

            if !config.keep_files {
                workload.cleanup_outputs(&run);
            }
            runs.push(run);
        }
    }
    Ok(runs)
}

fn cmd_strategies() {
    println!("=== Built-in Strategies ===");
    for name in BUILTIN_STRATEGIES {
        let description = match *name {
            "buffered" => "read/write loop through a fixed buffer",
            "zero-copy" => "kernel-side transfer (copy_file_range on Linux)",
            "std-copy" => "std::fs::copy whole-file helper",
            "mmap" => "memory-mapped source and destination",
            "async" => "tokio file copy",
            _ => "",
        };
        println!("  {:<10} {}", name, description);
    }
}

fn print_config(config: &BenchConfig) {
    eprintln!("=== Configuration ===");
    match &config.work_dir {
        Some(dir) => eprintln!("Directory:       {}", dir.display()),
        None => eprintln!("Directory:       <temp>"),
    }
    eprintln!(
        "File sizes:      {}",
        config
            .file_sizes
            .iter()
            .map(|s| humansize::format_size(*s, humansize::BINARY))
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!("Strategies:      {}", config.strategies.join(", "));
    eprintln!(
        "Modes:           {}",
        config
            .modes
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if config.max_parallelism == 0 {
        eprintln!("Parallelism:     one per file");
    } else {
        eprintln!("Parallelism:     {}", config.max_parallelism);
    }
    eprintln!(
        "Buffer size:     {}",
        humansize::format_size(config.buffer_size as u64, humansize::BINARY)
    );
    eprintln!("CPUs:            {}", num_cpus::get());
    eprintln!();
}
