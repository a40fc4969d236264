//! Tests for the exclusive file lock
//!
//! These tests verify:
//! - Acquire creates the lock file and never removes it
//! - Two lock instances on one path: exactly one succeeds
//! - Release is idempotent and frees the lock for the next holder
//! - Validity tracks release and external deletion

use std::fs;
use std::path::PathBuf;

use flatdb::{ExclusiveFileLock, FlatDbError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_lock_path() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let lock_path = temp_dir.path().join("LOCK");
    (temp_dir, lock_path)
}

// =============================================================================
// Acquire / Release Tests
// =============================================================================

#[test]
fn test_acquire_creates_file() {
    let (_temp, lock_path) = setup_lock_path();
    assert!(!lock_path.exists());

    let lock = ExclusiveFileLock::acquire(&lock_path).unwrap();

    assert!(lock_path.exists());
    assert!(lock.is_valid());
    assert_eq!(lock.path(), lock_path.as_path());
}

#[test]
fn test_second_acquire_fails() {
    let (_temp, lock_path) = setup_lock_path();

    let first = ExclusiveFileLock::acquire(&lock_path);
    let second = ExclusiveFileLock::acquire(&lock_path);

    assert!(first.is_ok());
    assert!(matches!(second, Err(FlatDbError::LockHeld(_))));
}

#[test]
fn test_release_allows_reacquire() {
    let (_temp, lock_path) = setup_lock_path();

    let mut lock = ExclusiveFileLock::acquire(&lock_path).unwrap();
    lock.release().unwrap();
    assert!(!lock.is_valid());

    let again = ExclusiveFileLock::acquire(&lock_path).unwrap();
    assert!(again.is_valid());
}

#[test]
fn test_release_is_idempotent() {
    let (_temp, lock_path) = setup_lock_path();

    let mut lock = ExclusiveFileLock::acquire(&lock_path).unwrap();
    lock.release().unwrap();
    lock.release().unwrap();
    assert!(!lock.is_valid());
}

#[test]
fn test_drop_releases() {
    let (_temp, lock_path) = setup_lock_path();

    {
        let _lock = ExclusiveFileLock::acquire(&lock_path).unwrap();
    }

    let _lock = ExclusiveFileLock::acquire(&lock_path).unwrap();
}

#[test]
fn test_release_keeps_file() {
    let (_temp, lock_path) = setup_lock_path();

    let mut lock = ExclusiveFileLock::acquire(&lock_path).unwrap();
    lock.release().unwrap();

    assert!(lock_path.exists());
}

#[test]
fn test_existing_file_content_preserved() {
    let (_temp, lock_path) = setup_lock_path();
    fs::write(&lock_path, b"stale").unwrap();

    let _lock = ExclusiveFileLock::acquire(&lock_path).unwrap();

    assert_eq!(fs::read(&lock_path).unwrap(), b"stale");
}

// =============================================================================
// Validity Tests
// =============================================================================

#[cfg(unix)]
#[test]
fn test_deleted_lock_file_invalidates() {
    let (_temp, lock_path) = setup_lock_path();

    let lock = ExclusiveFileLock::acquire(&lock_path).unwrap();
    fs::remove_file(&lock_path).unwrap();

    assert!(!lock.is_valid());
}

#[cfg(unix)]
#[test]
fn test_replaced_lock_file_invalidates() {
    let (temp, lock_path) = setup_lock_path();

    let lock = ExclusiveFileLock::acquire(&lock_path).unwrap();

    let other = temp.path().join("LOCK.new");
    fs::write(&other, b"").unwrap();
    fs::rename(&other, &lock_path).unwrap();

    assert!(!lock.is_valid());
}
