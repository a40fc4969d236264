//! Store Module
//!
//! The minimal owner of a position table: it holds the directory lock,
//! the table and its log, and drives them through open, batches, flush
//! and close.
//!
//! ## Responsibilities
//! - Acquire the exclusive lock before touching any file
//! - Create or reopen the table file (load it, or map it)
//! - Replay a leftover log into the table on open
//! - Log every slot mutation made inside a batch
//! - Flush the table and discard the log once it is folded in

use std::fs::{self, File, OpenOptions};
use std::io::BufReader;
use std::path::Path;

use crate::codec;
use crate::config::Config;
use crate::error::{FlatDbError, Result};
use crate::lock::ExclusiveFileLock;
use crate::table::{Int32Table, LongTable, MemoryMappedTable, Table, TableKind, UInt40Table};
use crate::wal::{LogManager, LogTarget, ReplayReport};

/// The table plus its backing file, replayed into through [`LogTarget`]
struct TableState {
    table: Box<dyn Table>,

    /// Backing file of in-process tables; mapped tables own their file
    file: Option<File>,

    /// Whether the backing file already holds a full image of the table
    saved_once: bool,
}

impl TableState {
    /// Open the table described by `config`, loading any existing image
    fn open(config: &Config) -> Result<Self> {
        let path = config.table_path();

        let mut table: Box<dyn Table> = match config.table_kind {
            TableKind::Int32 => Box::new(Int32Table::new(config.capacity)?),
            TableKind::Long => Box::new(LongTable::new(config.capacity)?),
            TableKind::UInt40 => Box::new(UInt40Table::with_paging(
                config.capacity,
                config.dirty_page_slots,
                config.full_rewrite_ratio,
            )?),
            TableKind::MemoryMapped { slot_width } => {
                // Content already lives in the file
                let table = MemoryMappedTable::open(&path, config.capacity, slot_width, config.warm_up)?;
                return Ok(Self {
                    table: Box::new(table),
                    file: None,
                    saved_once: true,
                });
            }
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let width = table.slot_width() as u64;
        let stored = (file.metadata()?.len() / width).min(config.capacity as u64) as usize;
        if stored > 0 {
            let mut reader = BufReader::new(File::open(&path)?);
            table.load(&mut reader, stored)?;
            tracing::debug!("Loaded {} of {} slots from {}", stored, config.capacity, path.display());
        }

        Ok(Self {
            table,
            file: Some(file),
            saved_once: stored == config.capacity,
        })
    }

    /// Table index for a logged position, if inside the table
    fn slot_index(&self, position: u64) -> Result<usize> {
        let len = self.table.len();
        usize::try_from(position)
            .ok()
            .filter(|&i| i < len)
            .ok_or_else(|| FlatDbError::TableSize(format!("slot {} outside table of {} slots", position, len)))
    }
}

impl LogTarget for TableState {
    fn check_log_entry(&self, position: u64, value: i64) -> Result<()> {
        self.slot_index(position)?;
        if self.table.kind().value_bits() == 40 {
            codec::check_long5(value)?;
        }
        Ok(())
    }

    fn process_log_entry(&mut self, position: u64, value: i64) -> Result<()> {
        let index = self.slot_index(position)?;
        self.table.set(index, value)
    }

    fn save(&mut self) -> Result<()> {
        if self.saved_once && !self.table.is_modified() {
            return Ok(());
        }

        match &self.file {
            Some(file) => {
                if self.saved_once {
                    self.table.update(file, 0)?;
                } else {
                    self.table.flush(file, 0)?;
                }
                file.sync_data()?;
            }
            None => self.table.sync()?,
        }

        self.table.clear_dirty_tracking();
        self.saved_once = true;
        Ok(())
    }
}

/// A locked database directory holding one position table and its log
///
/// ## Concurrency:
/// - Slot mutation takes `&mut self`; the owner serializes writers
/// - The exclusive lock keeps other store instances out of the directory
pub struct TableStore {
    config: Config,
    lock: ExclusiveFileLock,
    state: TableState,
    log: LogManager,
    last_replay: ReplayReport,
}

impl TableStore {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Acquire the exclusive lock (fails fast if held)
    /// 3. Open the table, loading or mapping the existing file
    /// 4. Replay and delete any leftover log
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Validate and prepare the directory
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Lock before any table or log file is touched
        let lock = ExclusiveFileLock::acquire(config.lock_path())?;

        // Step 3: Table
        let mut state = TableState::open(&config)?;

        // Step 4: Replay leftover log
        let log = LogManager::new(config.log_path(), config.frame_layout, config.log_write_mode);
        let last_replay = log.replay(&mut state)?;

        tracing::info!(
            "Opened store {} ({:?}, {} slots)",
            config.data_dir.display(),
            config.table_kind,
            config.capacity
        );

        Ok(Self {
            config,
            lock,
            state,
            log,
            last_replay,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Batches
    // =========================================================================

    /// Start logging mutations as one atomic batch
    ///
    /// Refused once the directory lock is no longer in force.
    pub fn begin_batch(&self) -> Result<()> {
        if !self.lock.is_valid() {
            return Err(FlatDbError::LockReleased);
        }
        self.log.begin_log()
    }

    /// Commit the open batch (End frame forced to disk)
    pub fn end_batch(&self) -> Result<()> {
        self.log.end_log()
    }

    // =========================================================================
    // Slots
    // =========================================================================

    /// Value of slot `index`
    ///
    /// # Panics
    /// If `index` is outside the table.
    pub fn get(&self, index: usize) -> i64 {
        self.state.table.get(index)
    }

    /// Set slot `index`, logging the change when a batch is open
    ///
    /// # Panics
    /// If `index` is outside the table.
    pub fn set(&mut self, index: usize, value: i64) -> Result<()> {
        self.state.table.set(index, value)?;
        // Log what the slot holds, which may be narrower than `value`
        self.log.log_set_pos(index as u64, self.state.table.get(index))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the table to its file and, if configured, drop the log
    ///
    /// Refused while a batch is open: its mutations are uncommitted and must
    /// not reach the table file before their End frame.
    pub fn flush(&mut self) -> Result<()> {
        if self.log.is_batch_open() {
            return Err(FlatDbError::BatchReentrancy);
        }
        self.state.save()?;
        if self.config.delete_log_after_flush {
            self.log.delete_log()?;
        }
        Ok(())
    }

    /// Flush and release the lock
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.lock.release()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn len(&self) -> usize {
        self.state.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.table.is_empty()
    }

    pub fn table(&self) -> &dyn Table {
        self.state.table.as_ref()
    }

    pub fn log(&self) -> &LogManager {
        &self.log
    }

    /// What the replay on open found
    pub fn last_replay(&self) -> &ReplayReport {
        &self.last_replay
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_valid()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
