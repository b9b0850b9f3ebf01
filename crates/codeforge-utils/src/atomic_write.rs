//! Atomic file writes for namespace storage
//!
//! Every artifact write goes through [`write_bytes_atomic`]:
//! - content lands in a temporary file next to the target and is fsynced
//! - the temporary file is renamed over the target
//! - a rename across filesystems falls back to copy, fsync, replace
//!
//! A reader therefore sees either the previous content or the new content,
//! never a truncated file, even if the process dies halfway through a step.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Outcome details of an atomic write
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    /// Number of bytes written
    pub bytes_written: usize,
    /// Whether the cross-filesystem fallback was needed
    pub used_cross_filesystem_fallback: bool,
}

/// Atomically write `bytes` to `path` exactly as given, creating parent
/// directories.
pub fn write_bytes_atomic(path: &Utf8Path, bytes: &[u8]) -> Result<AtomicWriteResult> {
    let parent = match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {parent}"))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {parent}"))?;
    temp_file
        .write_all(bytes)
        .context("Failed to write content to temporary file")?;
    temp_file
        .as_file()
        .sync_all()
        .context("Failed to fsync temporary file")?;

    let mut result = AtomicWriteResult {
        bytes_written: bytes.len(),
        used_cross_filesystem_fallback: false,
    };

    match temp_file.persist(path.as_std_path()) {
        Ok(_) => {}
        Err(e) if is_cross_filesystem_error(&e.error) => {
            result.used_cross_filesystem_fallback = true;
            // Keep the temp file alive until the copy is done.
            let file = e.file;
            cross_filesystem_copy(file.path(), path)?;
        }
        Err(e) => {
            return Err(anyhow::anyhow!(e.error))
                .with_context(|| format!("Failed to atomically write file: {path}"));
        }
    }

    tracing::trace!(path = %path, bytes = result.bytes_written, "atomic write");
    Ok(result)
}

#[cfg(unix)]
fn is_cross_filesystem_error(err: &std::io::Error) -> bool {
    // EXDEV on Linux and macOS
    err.raw_os_error() == Some(18)
}

#[cfg(not(unix))]
fn is_cross_filesystem_error(_err: &std::io::Error) -> bool {
    false
}

fn cross_filesystem_copy(temp_path: &Path, target: &Utf8Path) -> Result<()> {
    let content =
        fs::read(temp_path).context("Failed to read temporary file for cross-filesystem copy")?;

    let target_dir = target.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut target_temp = NamedTempFile::new_in(target_dir)
        .with_context(|| format!("Failed to create temp file in target directory: {target_dir}"))?;
    target_temp
        .write_all(&content)
        .context("Failed to write content during cross-filesystem copy")?;
    target_temp
        .as_file()
        .sync_all()
        .context("Failed to fsync during cross-filesystem copy")?;
    target_temp
        .persist(target.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .context("Failed to persist during cross-filesystem copy")?;

    Ok(())
}
