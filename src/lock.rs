//! Exclusive File Lock
//!
//! Guarantees a single writer per database directory.
//!
//! ## Responsibilities
//! - Create the lock file if absent (never removed on release)
//! - Take a non-blocking exclusive OS lock; fail fast if held elsewhere
//! - Release the lock and close the handle (idempotent)
//! - Detect when the lock file was replaced or removed behind our back

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{FlatDbError, Result};

/// Identity of the locked file, used to detect external replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self { dev: meta.dev(), ino: meta.ino() }
    }

    #[cfg(not(unix))]
    fn of(_meta: &std::fs::Metadata) -> Self {
        Self {}
    }
}

/// An exclusive advisory lock held on a dedicated lock file
///
/// Dropping the lock releases it.
#[derive(Debug)]
pub struct ExclusiveFileLock {
    file: Option<File>,
    path: PathBuf,
    identity: FileIdentity,
}

impl ExclusiveFileLock {
    /// Open (creating if absent) the lock file and lock it without blocking
    ///
    /// Returns `LockHeld` immediately when another lock instance, in this or
    /// any other process, already owns the file.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if let Err(e) = file.try_lock_exclusive() {
            tracing::warn!("Lock {} is held elsewhere: {}", path.display(), e);
            return Err(FlatDbError::LockHeld(path));
        }

        let identity = FileIdentity::of(&file.metadata()?);
        tracing::debug!("Acquired exclusive lock on {}", path.display());

        Ok(Self {
            file: Some(file),
            path,
            identity,
        })
    }

    /// Drop the OS lock and close the handle
    ///
    /// Calling this again after the first release does nothing.
    pub fn release(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let unlocked = file.unlock();
        drop(file);
        tracing::debug!("Released lock on {}", self.path.display());
        unlocked?;
        Ok(())
    }

    /// Whether the lock is still in force
    ///
    /// False after `release`, or when the lock file at `path` no longer is
    /// the file we locked (deleted or replaced externally).
    pub fn is_valid(&self) -> bool {
        if self.file.is_none() {
            return false;
        }
        match std::fs::metadata(&self.path) {
            Ok(meta) => FileIdentity::of(&meta) == self.identity,
            Err(_) => false,
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExclusiveFileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}
