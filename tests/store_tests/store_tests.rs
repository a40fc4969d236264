//! Tests for TableStore
//!
//! These tests verify:
//! - Open creates the lock and table files
//! - Committed batches survive a crash through log replay
//! - Uncommitted batches leave the table as it was
//! - Flush folds the log into the table and removes it
//! - A second store on the same directory is locked out
//! - Every table kind persists across reopen

use std::fs;
use std::path::Path;

use flatdb::config::Config;
use flatdb::table::MappedSlotWidth;
use flatdb::wal::{FrameLayout, LogRecord, LogWriter, ReplayOutcome, WriteMode};
use flatdb::{FlatDbError, TableKind, TableStore};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const CAPACITY: usize = 100;

fn test_config(dir: &Path, kind: TableKind) -> Config {
    Config::builder()
        .data_dir(dir)
        .table_kind(kind)
        .capacity(CAPACITY)
        .dirty_page_slots(16)
        .warm_up(false)
        .build()
}

fn all_kinds() -> Vec<TableKind> {
    vec![
        TableKind::Int32,
        TableKind::Long,
        TableKind::UInt40,
        TableKind::MemoryMapped { slot_width: MappedSlotWidth::Long5 },
        TableKind::MemoryMapped { slot_width: MappedSlotWidth::Long8 },
    ]
}

// =============================================================================
// Open / Close Tests
// =============================================================================

#[test]
fn test_open_creates_files() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), TableKind::UInt40);

    let store = TableStore::open(config.clone()).unwrap();

    assert!(config.lock_path().exists());
    assert!(config.table_path().exists());
    assert!(!config.log_path().exists());
    assert!(store.is_locked());
    assert_eq!(store.len(), CAPACITY);
    assert_eq!(store.last_replay().outcome, ReplayOutcome::NoLog);
}

#[test]
fn test_open_path_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("db");

    let store = TableStore::open_path(&data_dir).unwrap();

    assert_eq!(store.data_dir(), data_dir.as_path());
    assert_eq!(store.config().table_kind, TableKind::UInt40);
    assert_eq!(store.len(), 1 << 16);
}

#[test]
fn test_second_open_is_locked_out() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), TableKind::Long);

    let first = TableStore::open(config.clone()).unwrap();
    let second = TableStore::open(config.clone());
    assert!(matches!(second, Err(FlatDbError::LockHeld(_))));

    first.close().unwrap();
    let _third = TableStore::open(config).unwrap();
}

#[cfg(unix)]
#[test]
fn test_lost_lock_refuses_batches() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), TableKind::Long);

    let store = TableStore::open(config.clone()).unwrap();
    fs::remove_file(config.lock_path()).unwrap();

    assert!(!store.is_locked());
    assert!(matches!(store.begin_batch(), Err(FlatDbError::LockReleased)));
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let base = test_config(temp_dir.path(), TableKind::Long);

    let zero = Config { capacity: 0, ..base.clone() };
    let ratio = Config { full_rewrite_ratio: 0.0, ..base.clone() };
    let page = Config {
        log_write_mode: WriteMode::Paged { page_size: 10 },
        ..base.clone()
    };
    let narrow = Config {
        frame_layout: FrameLayout::PosU64ValU32,
        ..base.clone()
    };

    for config in [zero, ratio, page, narrow] {
        assert!(matches!(TableStore::open(config), Err(FlatDbError::Config(_))));
    }
    assert!(!base.lock_path().exists());
}

#[cfg(target_pointer_width = "64")]
#[test]
fn test_capacity_beyond_position_field_rejected() {
    let config = Config {
        capacity: u32::MAX as usize + 2,
        ..Config::default()
    };
    assert!(matches!(config.validate(), Err(FlatDbError::Config(_))));
}

// =============================================================================
// Batch / Flush Tests
// =============================================================================

#[test]
fn test_batch_flush_close_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), TableKind::UInt40);

    let mut store = TableStore::open(config.clone()).unwrap();
    store.begin_batch().unwrap();
    store.set(5, 123).unwrap();
    store.set(9, 456).unwrap();
    store.end_batch().unwrap();
    assert!(config.log_path().exists());

    store.flush().unwrap();
    assert!(!config.log_path().exists());
    store.close().unwrap();

    let store = TableStore::open(config.clone()).unwrap();
    assert_eq!(store.get(5), 123);
    assert_eq!(store.get(9), 456);
    assert_eq!(store.get(0), 0);
    assert_eq!(store.last_replay().outcome, ReplayOutcome::NoLog);
    assert_eq!(fs::metadata(config.table_path()).unwrap().len(), (CAPACITY * 5) as u64);
}

#[test]
fn test_set_outside_batch_is_not_logged() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), TableKind::Long);

    let mut store = TableStore::open(config.clone()).unwrap();
    store.set(1, 1).unwrap();

    assert!(!config.log_path().exists());
    assert_eq!(store.get(1), 1);
}

#[test]
fn test_flush_during_batch_is_refused() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), TableKind::Long);

    let mut store = TableStore::open(config.clone()).unwrap();
    store.begin_batch().unwrap();
    store.set(1, 1).unwrap();

    assert!(matches!(store.flush(), Err(FlatDbError::BatchReentrancy)));
    assert!(config.log_path().exists());
    assert_eq!(fs::metadata(config.table_path()).unwrap().len(), 0);

    store.end_batch().unwrap();
    store.flush().unwrap();
    assert!(!config.log_path().exists());
    assert_eq!(fs::metadata(config.table_path()).unwrap().len(), (CAPACITY * 8) as u64);
}

#[test]
fn test_crash_after_refused_mid_batch_flush() {
    for kind in [TableKind::Int32, TableKind::Long, TableKind::UInt40] {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path(), kind);

        {
            let mut store = TableStore::open(config.clone()).unwrap();
            store.begin_batch().unwrap();
            store.set(1, 10).unwrap();
            store.end_batch().unwrap();
            store.flush().unwrap();

            store.begin_batch().unwrap();
            store.set(1, 42).unwrap();
            assert!(store.flush().is_err());
            // Crash before End
        }

        let store = TableStore::open(config).unwrap();
        assert_eq!(store.last_replay().outcome, ReplayOutcome::CrashedBatchDiscarded);
        assert_eq!(store.get(1), 10, "{:?}", kind);
    }
}

#[test]
fn test_keep_log_after_flush() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        delete_log_after_flush: false,
        ..test_config(temp_dir.path(), TableKind::Long)
    };

    let mut store = TableStore::open(config.clone()).unwrap();
    store.begin_batch().unwrap();
    store.set(2, 22).unwrap();
    store.end_batch().unwrap();
    store.close().unwrap();
    assert!(config.log_path().exists());

    // Replaying an already-flushed batch is harmless
    let store = TableStore::open(config.clone()).unwrap();
    assert_eq!(store.last_replay().outcome, ReplayOutcome::Clean);
    assert_eq!(store.get(2), 22);
    assert!(!config.log_path().exists());
}

#[test]
fn test_nested_batch_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let store = TableStore::open(test_config(temp_dir.path(), TableKind::Int32)).unwrap();

    store.begin_batch().unwrap();
    assert!(matches!(store.begin_batch(), Err(FlatDbError::BatchReentrancy)));
    store.end_batch().unwrap();
    assert!(matches!(store.end_batch(), Err(FlatDbError::UnmatchedBatchEnd)));
}

// =============================================================================
// Crash Recovery Tests
// =============================================================================

#[test]
fn test_committed_batch_survives_crash() {
    for kind in all_kinds() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path(), kind);

        {
            let mut store = TableStore::open(config.clone()).unwrap();
            store.begin_batch().unwrap();
            store.set(5, 123).unwrap();
            store.set(99, -456).unwrap();
            store.end_batch().unwrap();
            // Crash: dropped without flush
        }

        let store = TableStore::open(config.clone()).unwrap();
        assert_eq!(store.last_replay().outcome, ReplayOutcome::Clean, "{:?}", kind);
        assert_eq!(store.last_replay().entries_applied, 2);
        assert_eq!(store.get(5), 123, "{:?}", kind);
        assert_eq!(store.get(99), -456, "{:?}", kind);
        assert!(!config.log_path().exists());
    }
}

#[test]
fn test_uncommitted_batch_discarded() {
    for kind in [TableKind::Int32, TableKind::Long, TableKind::UInt40] {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path(), kind);

        {
            let mut store = TableStore::open(config.clone()).unwrap();
            store.begin_batch().unwrap();
            store.set(1, 10).unwrap();
            store.end_batch().unwrap();
            store.flush().unwrap();

            store.begin_batch().unwrap();
            store.set(1, 999).unwrap();
            store.set(2, 999).unwrap();
            // Crash before End
        }

        let store = TableStore::open(config.clone()).unwrap();
        let report = store.last_replay();
        assert_eq!(report.outcome, ReplayOutcome::CrashedBatchDiscarded, "{:?}", kind);
        assert_eq!(report.entries_discarded, 2);
        assert_eq!(store.get(1), 10);
        assert_eq!(store.get(2), 0);
    }
}

#[test]
fn test_narrow_log_values_for_int32_table() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        frame_layout: FrameLayout::PosU64ValU32,
        ..test_config(temp_dir.path(), TableKind::Int32)
    };

    {
        let mut store = TableStore::open(config.clone()).unwrap();
        store.begin_batch().unwrap();
        store.set(3, -3).unwrap();
        store.set(4, 0x1_0000_0007).unwrap();
        store.end_batch().unwrap();
    }

    let store = TableStore::open(config).unwrap();
    assert_eq!(store.get(3), -3);
    assert_eq!(store.get(4), 7);
}

#[test]
fn test_replay_stops_at_slot_outside_table() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), TableKind::Long);

    {
        let mut writer =
            LogWriter::open(&config.log_path(), config.frame_layout, WriteMode::Immediate).unwrap();
        for record in [
            LogRecord::begin(),
            LogRecord::entry(7, 70),
            LogRecord::end(),
            LogRecord::begin(),
            LogRecord::entry(3, 30),
            LogRecord::entry(CAPACITY as u64, 1),
            LogRecord::end(),
        ] {
            writer.append(&record).unwrap();
        }
        writer.close().unwrap();
    }

    let store = TableStore::open(config.clone()).unwrap();
    assert!(matches!(store.last_replay().outcome, ReplayOutcome::Corrupt { .. }));
    assert_eq!(store.last_replay().batches_applied, 1);
    assert_eq!(store.get(7), 70);
    assert_eq!(store.get(3), 0);
    assert!(!config.log_path().exists());
}

#[test]
fn test_replay_rejects_out_of_range_value_batch() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), TableKind::UInt40);

    {
        let mut writer =
            LogWriter::open(&config.log_path(), config.frame_layout, WriteMode::Immediate).unwrap();
        for record in [
            LogRecord::begin(),
            LogRecord::entry(1, 11),
            LogRecord::entry(2, 1 << 40),
            LogRecord::end(),
        ] {
            writer.append(&record).unwrap();
        }
        writer.close().unwrap();
    }

    let store = TableStore::open(config.clone()).unwrap();
    assert!(matches!(store.last_replay().outcome, ReplayOutcome::Corrupt { .. }));
    assert_eq!(store.last_replay().entries_discarded, 2);
    assert_eq!(store.get(1), 0);
    drop(store);

    // Nothing of the rejected batch reached the table file
    let store = TableStore::open(config).unwrap();
    assert_eq!(store.get(1), 0);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_every_kind_persists_across_reopen() {
    for kind in all_kinds() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path(), kind);

        let mut store = TableStore::open(config.clone()).unwrap();
        for i in 0..CAPACITY {
            store.set(i, (i as i64) * 3 - 50).unwrap();
        }
        store.close().unwrap();

        let store = TableStore::open(config.clone()).unwrap();
        assert_eq!(store.table().kind(), kind);
        assert!((0..CAPACITY).all(|i| store.get(i) == (i as i64) * 3 - 50), "{:?}", kind);
        assert_eq!(
            fs::metadata(config.table_path()).unwrap().len(),
            (CAPACITY * kind.slot_width()) as u64
        );
    }
}

#[test]
fn test_shorter_file_loads_prefix() {
    let temp_dir = TempDir::new().unwrap();
    let small = Config {
        capacity: 10,
        ..test_config(temp_dir.path(), TableKind::UInt40)
    };

    let mut store = TableStore::open(small.clone()).unwrap();
    store.set(9, 9).unwrap();
    store.close().unwrap();

    let large = Config { capacity: 20, ..small };
    let mut store = TableStore::open(large.clone()).unwrap();
    assert_eq!(store.get(9), 9);
    assert_eq!(store.get(19), 0);

    store.set(19, 19).unwrap();
    store.close().unwrap();
    assert_eq!(fs::metadata(large.table_path()).unwrap().len(), 100);
}

#[test]
fn test_partial_page_update_after_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path(), TableKind::UInt40);

    let mut store = TableStore::open(config.clone()).unwrap();
    store.set(0, 1).unwrap();
    store.close().unwrap();

    let mut store = TableStore::open(config.clone()).unwrap();
    store.begin_batch().unwrap();
    store.set(50, 5).unwrap();
    store.end_batch().unwrap();
    store.close().unwrap();

    let store = TableStore::open(config).unwrap();
    assert_eq!(store.get(0), 1);
    assert_eq!(store.get(50), 5);
}
