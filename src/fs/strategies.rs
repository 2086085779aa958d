//! Built-in copy strategies
//!
//! Each strategy wraps one platform copy primitive. All of them open the
//! source before touching the destination, so a missing source never
//! leaves an empty destination file behind.

use crate::core::{AsyncCopyStrategy, BlockingAdapter, CopyStrategy, StrategyRegistry};
use crate::error::{IoResultExt, Result};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Options shared by the built-in strategies
#[derive(Debug, Clone)]
pub struct StrategyOptions {
    /// Buffer size for buffered and async copies
    pub buffer_size: usize,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self { buffer_size: 1024 }
    }
}

/// Build the registry of built-in strategies.
///
/// `handle` drives the async strategy when it is invoked from blocking
/// code; it must belong to a multi-thread runtime.
pub fn builtin_strategies(
    options: &StrategyOptions,
    handle: tokio::runtime::Handle,
) -> Result<StrategyRegistry> {
    let mut registry = StrategyRegistry::new();

    registry.register(Arc::new(BufferedCopy::new(options.buffer_size)))?;
    registry.register(Arc::new(ZeroCopy))?;
    registry.register(Arc::new(StdFsCopy))?;
    registry.register(Arc::new(MmapCopy))?;
    registry.register(Arc::new(BlockingAdapter::new(
        Arc::new(TokioCopy::new(options.buffer_size)),
        handle,
    )))?;

    Ok(registry)
}

fn ensure_parent(dest: &Path) -> Result<()> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).with_path(parent)
        }
        _ => Ok(()),
    }
}

/// Read/write loop through a fixed-size buffer
#[derive(Debug, Clone)]
pub struct BufferedCopy {
    buffer_size: usize,
}

impl BufferedCopy {
    /// Create with the given buffer size (at least 1 byte)
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }
}

impl CopyStrategy for BufferedCopy {
    fn name(&self) -> &str {
        "buffered"
    }

    fn copy(&self, source: &Path, dest: &Path) -> Result<u64> {
        let src_file = File::open(source).with_path(source)?;
        ensure_parent(dest)?;
        let dst_file = File::create(dest).with_path(dest)?;

        let mut reader = BufReader::with_capacity(self.buffer_size, src_file);
        let mut writer = BufWriter::with_capacity(self.buffer_size, dst_file);

        let mut buffer = vec![0u8; self.buffer_size];
        let mut bytes_copied = 0u64;

        loop {
            let bytes_read = reader.read(&mut buffer).with_path(source)?;
            if bytes_read == 0 {
                break;
            }

            writer.write_all(&buffer[..bytes_read]).with_path(dest)?;
            bytes_copied += bytes_read as u64;
        }

        writer.flush().with_path(dest)?;
        Ok(bytes_copied)
    }
}

/// Kernel-side transfer between file descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCopy;

impl ZeroCopy {
    /// Transfer up to `size` bytes, counting progress into `total`
    #[cfg(target_os = "linux")]
    fn transfer(src_file: &File, dst_file: &File, size: u64, total: &mut u64) -> std::io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let src_fd = src_file.as_raw_fd();
        let dst_fd = dst_file.as_raw_fd();

        while *total < size {
            let to_copy = (size - *total).min(isize::MAX as u64) as usize;

            // Null offsets use and advance the file positions
            let copied = unsafe {
                libc::copy_file_range(
                    src_fd,
                    std::ptr::null_mut(),
                    dst_fd,
                    std::ptr::null_mut(),
                    to_copy,
                    0,
                )
            };

            if copied < 0 {
                return Err(std::io::Error::last_os_error());
            }
            if copied == 0 {
                break; // EOF
            }

            *total += copied as u64;
        }

        Ok(())
    }

    /// Errors after which a plain userspace copy still works
    #[cfg(target_os = "linux")]
    fn is_unsupported(err: &std::io::Error) -> bool {
        matches!(
            err.raw_os_error(),
            Some(libc::EXDEV) | Some(libc::ENOSYS) | Some(libc::EINVAL) | Some(libc::EOPNOTSUPP)
        )
    }
}

impl CopyStrategy for ZeroCopy {
    fn name(&self) -> &str {
        "zero-copy"
    }

    #[cfg(target_os = "linux")]
    fn copy(&self, source: &Path, dest: &Path) -> Result<u64> {
        let mut src_file = File::open(source).with_path(source)?;
        let size = src_file.metadata().with_path(source)?.len();
        ensure_parent(dest)?;
        let mut dst_file = File::create(dest).with_path(dest)?;

        let mut total = 0u64;
        match Self::transfer(&src_file, &dst_file, size, &mut total) {
            Ok(()) => Ok(total),
            Err(e) if Self::is_unsupported(&e) => {
                tracing::debug!("copy_file_range unavailable for {:?}: {}", source, e);
                // Resume from the current file positions
                let rest = std::io::copy(&mut src_file, &mut dst_file).with_path(source)?;
                Ok(total + rest)
            }
            Err(e) => Err(crate::error::BenchError::io(source, e)),
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn copy(&self, source: &Path, dest: &Path) -> Result<u64> {
        let mut src_file = File::open(source).with_path(source)?;
        ensure_parent(dest)?;
        let mut dst_file = File::create(dest).with_path(dest)?;
        std::io::copy(&mut src_file, &mut dst_file).with_path(source)
    }
}

/// `std::fs::copy` whole-file helper
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFsCopy;

impl CopyStrategy for StdFsCopy {
    fn name(&self) -> &str {
        "std-copy"
    }

    fn copy(&self, source: &Path, dest: &Path) -> Result<u64> {
        // Fail on the source before creating any destination directories
        std::fs::metadata(source).with_path(source)?;
        ensure_parent(dest)?;
        std::fs::copy(source, dest).with_path(source)
    }
}

/// Memory-mapped source and destination
#[derive(Debug, Clone, Copy, Default)]
pub struct MmapCopy;

impl CopyStrategy for MmapCopy {
    fn name(&self) -> &str {
        "mmap"
    }

    fn copy(&self, source: &Path, dest: &Path) -> Result<u64> {
        use memmap2::{Mmap, MmapMut};

        let src_file = File::open(source).with_path(source)?;
        let size = src_file.metadata().with_path(source)?.len();
        ensure_parent(dest)?;

        if size == 0 {
            // Zero-length mappings are rejected
            File::create(dest).with_path(dest)?;
            return Ok(0);
        }

        let dst_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(dest)
            .with_path(dest)?;

        dst_file.set_len(size).with_path(dest)?;

        let src_mmap = unsafe { Mmap::map(&src_file) }.with_path(source)?;
        let mut dst_mmap = unsafe { MmapMut::map_mut(&dst_file) }.with_path(dest)?;

        dst_mmap.copy_from_slice(&src_mmap);
        dst_mmap.flush().with_path(dest)?;

        Ok(size)
    }
}

/// Async copy through tokio file handles
#[derive(Debug, Clone)]
pub struct TokioCopy {
    buffer_size: usize,
}

impl TokioCopy {
    /// Create with the given write buffer size
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }
}

#[async_trait]
impl AsyncCopyStrategy for TokioCopy {
    fn name(&self) -> &str {
        "async"
    }

    async fn copy(&self, source: &Path, dest: &Path) -> Result<u64> {
        use tokio::io::AsyncWriteExt;

        let mut src_file = tokio::fs::File::open(source).await.with_path(source)?;

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_path(parent)?;
        }

        let dst_file = tokio::fs::File::create(dest).await.with_path(dest)?;
        let mut writer = tokio::io::BufWriter::with_capacity(self.buffer_size, dst_file);

        let bytes_copied = tokio::io::copy(&mut src_file, &mut writer)
            .await
            .with_path(source)?;
        writer.flush().await.with_path(dest)?;

        Ok(bytes_copied)
    }
}
