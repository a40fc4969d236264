//! Configuration for FlatDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{FlatDbError, Result};
use crate::table::TableKind;
use crate::wal::{FrameLayout, WriteMode, FRAME_SIZE};

/// Default page size for the buffered log writer (32 KB)
pub const DEFAULT_LOG_PAGE_SIZE: usize = 32 * 1024;

/// Dirty-page ratio above which a full table rewrite beats page writes
pub const DEFAULT_FULL_REWRITE_RATIO: f64 = 0.8;

/// Slots per dirty-tracking page for packed 40-bit tables
pub const DEFAULT_DIRTY_PAGE_SLOTS: usize = 1024;

/// Main configuration for a FlatDB store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── LOCK          (exclusive lock file)
    ///     ├── table.dat     (packed position table)
    ///     └── table.log     (write-ahead log, present only while unflushed)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// Slot width and medium of the position table
    pub table_kind: TableKind,

    /// Number of slots (fixed for the life of the table)
    pub capacity: usize,

    /// Dirty ratio above which `update` rewrites the whole table
    pub full_rewrite_ratio: f64,

    /// Slots per dirty-tracking page (packed 40-bit tables only)
    pub dirty_page_slots: usize,

    /// Touch the mapping once per stride on open to pre-fault pages
    pub warm_up: bool,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Byte layout of log frames
    pub frame_layout: FrameLayout,

    /// Immediate or page-buffered frame writes
    pub log_write_mode: WriteMode,

    /// Remove the log once the table has been flushed
    pub delete_log_after_flush: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./flatdb_data"),
            table_kind: TableKind::UInt40,
            capacity: 1 << 16,
            full_rewrite_ratio: DEFAULT_FULL_REWRITE_RATIO,
            dirty_page_slots: DEFAULT_DIRTY_PAGE_SLOTS,
            warm_up: true,
            frame_layout: FrameLayout::PosU32ValU64,
            log_write_mode: WriteMode::Paged { page_size: DEFAULT_LOG_PAGE_SIZE },
            delete_log_after_flush: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject combinations the store cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(FlatDbError::Config("capacity must be at least one slot".into()));
        }
        if !(self.full_rewrite_ratio > 0.0 && self.full_rewrite_ratio <= 1.0) {
            return Err(FlatDbError::Config(format!(
                "full_rewrite_ratio {} outside (0, 1]",
                self.full_rewrite_ratio
            )));
        }
        if self.dirty_page_slots == 0 {
            return Err(FlatDbError::Config("dirty_page_slots must be positive".into()));
        }
        if let WriteMode::Paged { page_size } = self.log_write_mode {
            if page_size == 0 || page_size % FRAME_SIZE != 0 {
                return Err(FlatDbError::Config(format!(
                    "log page size {} is not a positive multiple of {}",
                    page_size, FRAME_SIZE
                )));
            }
        }
        // Positions are slot indices; values are the table's slot contents
        if self.frame_layout.max_position() < (self.capacity - 1) as u64 {
            return Err(FlatDbError::Config(format!(
                "frame layout {:?} cannot address {} slots",
                self.frame_layout, self.capacity
            )));
        }
        if self.frame_layout.value_bits() < self.table_kind.value_bits() {
            return Err(FlatDbError::Config(format!(
                "frame layout {:?} cannot carry {}-bit values of {:?}",
                self.frame_layout,
                self.table_kind.value_bits(),
                self.table_kind
            )));
        }
        Ok(())
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join("LOCK")
    }

    pub fn table_path(&self) -> PathBuf {
        self.data_dir.join("table.dat")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("table.log")
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the table slot width / medium
    pub fn table_kind(mut self, kind: TableKind) -> Self {
        self.config.table_kind = kind;
        self
    }

    /// Set the number of slots
    pub fn capacity(mut self, slots: usize) -> Self {
        self.config.capacity = slots;
        self
    }

    /// Set the dirty ratio that triggers a full rewrite
    pub fn full_rewrite_ratio(mut self, ratio: f64) -> Self {
        self.config.full_rewrite_ratio = ratio;
        self
    }

    /// Set the number of slots per dirty-tracking page
    pub fn dirty_page_slots(mut self, slots: usize) -> Self {
        self.config.dirty_page_slots = slots;
        self
    }

    /// Enable or disable the mapping warm-up pass
    pub fn warm_up(mut self, enabled: bool) -> Self {
        self.config.warm_up = enabled;
        self
    }

    /// Set the log frame layout
    pub fn frame_layout(mut self, layout: FrameLayout) -> Self {
        self.config.frame_layout = layout;
        self
    }

    /// Set the log write mode
    pub fn log_write_mode(mut self, mode: WriteMode) -> Self {
        self.config.log_write_mode = mode;
        self
    }

    /// Keep or delete the log after each flush
    pub fn delete_log_after_flush(mut self, delete: bool) -> Self {
        self.config.delete_log_after_flush = delete;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
