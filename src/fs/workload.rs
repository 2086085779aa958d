//! Benchmark fixtures
//!
//! Creates source files of requested sizes, plans per-run destination
//! paths and removes everything again afterwards.

use crate::core::{BenchmarkRun, CopyTask};
use crate::error::{BenchError, IoResultExt, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Pattern period; prime so block boundaries never line up with it
const PATTERN_PERIOD: usize = 251;

/// Write chunk, a multiple of the pattern period
const CHUNK_SIZE: usize = PATTERN_PERIOD * 256;

/// Set of generated source files in one directory
#[derive(Debug)]
pub struct Workload {
    dir: PathBuf,
    sources: Vec<PathBuf>,
    owns_dir: bool,
}

impl Workload {
    /// Generate `source_<i>.bin` files of the given sizes in `dir`.
    ///
    /// `dir` is created if missing, and then removed again by
    /// [`Workload::cleanup`].
    pub fn generate(dir: &Path, sizes: &[u64]) -> Result<Self> {
        if sizes.is_empty() {
            return Err(BenchError::config("workload needs at least one file size"));
        }

        let owns_dir = !dir.exists();
        std::fs::create_dir_all(dir).with_path(dir)?;

        let mut workload = Self {
            dir: dir.to_path_buf(),
            sources: Vec::with_capacity(sizes.len()),
            owns_dir,
        };

        for (i, size) in sizes.iter().enumerate() {
            let path = dir.join(format!("source_{}.bin", i));
            if let Err(e) = write_pattern_file(&path, *size) {
                // Do not leave half a workload behind
                workload.sources.push(path);
                if let Err(cleanup_err) = workload.cleanup() {
                    tracing::warn!("Failed to clean up partial workload: {}", cleanup_err);
                }
                return Err(e);
            }
            tracing::debug!("Created {:?} ({} bytes)", path, size);
            workload.sources.push(path);
        }

        Ok(workload)
    }

    /// Generate the workload in a fresh directory under the system temp dir
    pub fn in_temp_dir(sizes: &[u64]) -> Result<Self> {
        let dir = std::env::temp_dir().join(format!(
            "copybench-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        Self::generate(&dir, sizes)
    }

    /// Directory holding sources and outputs
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generated source files in size order given
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Sum of source file sizes
    pub fn total_bytes(&self) -> u64 {
        self.sources
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }

    /// Copy tasks mapping every source to `<label>_<i>.bin`
    pub fn tasks(&self, label: &str) -> Result<Vec<CopyTask>> {
        if label.is_empty() || label.contains(std::path::is_separator) {
            return Err(BenchError::InvalidTask(format!(
                "invalid output label '{}'",
                label
            )));
        }

        self.sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                CopyTask::new(source.clone(), self.dir.join(format!("{}_{}.bin", label, i)))
            })
            .collect()
    }

    /// Remove the destination files written by a run; returns how many were removed
    pub fn cleanup_outputs(&self, run: &BenchmarkRun) -> usize {
        run.results()
            .iter()
            .filter(|result| remove_if_exists(&result.task.destination))
            .count()
    }

    /// Remove the sources, and the directory if this workload created it
    pub fn cleanup(self) -> Result<()> {
        if self.owns_dir {
            std::fs::remove_dir_all(&self.dir).with_path(&self.dir)?;
            return Ok(());
        }
        self.cleanup_sources();
        Ok(())
    }

    fn cleanup_sources(&self) -> usize {
        self.sources.iter().filter(|p| remove_if_exists(p)).count()
    }
}

/// Write `size` bytes of the repeating `i % 251` pattern
fn write_pattern_file(path: &Path, size: u64) -> Result<()> {
    let file = File::create(path).with_path(path)?;
    let mut writer = BufWriter::new(file);

    let chunk: Vec<u8> = (0..CHUNK_SIZE).map(|i| (i % PATTERN_PERIOD) as u8).collect();
    let mut remaining = size;

    while remaining > 0 {
        let to_write = remaining.min(CHUNK_SIZE as u64) as usize;
        writer.write_all(&chunk[..to_write]).with_path(path)?;
        remaining -= to_write as u64;
    }

    writer.flush().with_path(path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
            false
        }
    }
}
