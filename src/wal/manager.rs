//! Log Manager
//!
//! Owns the batch state machine over one log file and replays a leftover
//! log into a [`LogTarget`] at startup.
//!
//! ## Batch State Machine
//! ```text
//!            begin_log()                 end_log()
//!   Idle ───────────────▶ BatchOpen ───────────────▶ Idle
//!                          │    ▲        (End frame forced to disk)
//!                          └────┘
//!                      log_set_pos()
//! ```
//!
//! ## Replay Rules
//! - Entries are buffered per batch and applied only when its End frame is read
//! - A nested Begin, an Entry or End outside a batch: stop, apply nothing more
//! - An unknown record type: save what was applied so far, stop
//! - A batch with an entry the target rejects is dropped whole, stop
//! - A trailing batch without End (or a torn final frame) is discarded
//! - The log file is deleted afterwards, unless saving or reading failed
//!
//! End frames are the only ones forced to disk, so a batch without End was
//! never acknowledged and is safe to drop.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{FlatDbError, Result};

use super::{FrameLayout, LogReader, LogRecord, LogWriter, RecordType, WriteMode};

/// The structure a log protects, seen only through replay
pub trait LogTarget {
    /// Apply one replayed slot mutation
    fn process_log_entry(&mut self, position: u64, value: i64) -> Result<()>;

    /// Whether `process_log_entry` would accept this mutation
    ///
    /// Replay checks every entry of a batch before applying any of them.
    fn check_log_entry(&self, _position: u64, _value: i64) -> Result<()> {
        Ok(())
    }

    /// Persist the target's in-memory table to its backing file
    fn save(&mut self) -> Result<()>;
}

/// How replay ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// No log file existed
    NoLog,
    /// The log file held no frames
    Empty,
    /// Every batch in the log was committed and applied
    Clean,
    /// A trailing batch had no End frame and was dropped
    CrashedBatchDiscarded,
    /// Replay stopped at a sequencing or format error
    Corrupt { reason: String },
}

/// Result of a replay run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Number of batches whose End frame was reached
    pub batches_applied: u64,

    /// Number of entries handed to the target
    pub entries_applied: u64,

    /// Number of entries dropped (uncommitted or after corruption)
    pub entries_discarded: u64,

    pub outcome: ReplayOutcome,
}

impl ReplayReport {
    fn new(outcome: ReplayOutcome) -> Self {
        Self {
            batches_applied: 0,
            entries_applied: 0,
            entries_discarded: 0,
            outcome,
        }
    }
}

/// Batch orchestration over a single log file
///
/// ## Concurrency:
/// - All methods take `&self`; frame appends are serialized by `writer`
/// - Callers still serialize whole batches among themselves: the manager
///   rejects a second `begin_log` but does not queue it
pub struct LogManager {
    path: PathBuf,
    layout: FrameLayout,
    mode: WriteMode,

    /// `Some` while a batch is open
    writer: Mutex<Option<LogWriter>>,

    /// Append failures swallowed by `log_set_pos`
    append_failures: AtomicU64,
}

impl LogManager {
    pub fn new(path: impl Into<PathBuf>, layout: FrameLayout, mode: WriteMode) -> Self {
        Self {
            path: path.into(),
            layout,
            mode,
            writer: Mutex::new(None),
            append_failures: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Batch protocol
    // =========================================================================

    /// Open the log for append and write a Begin frame
    pub fn begin_log(&self) -> Result<()> {
        let mut guard = self.writer.lock();
        if guard.is_some() {
            return Err(FlatDbError::BatchReentrancy);
        }

        let mut writer = LogWriter::open(&self.path, self.layout, self.mode)?;
        writer.append(&LogRecord::begin())?;
        *guard = Some(writer);
        Ok(())
    }

    /// Append an Entry frame for `(position, value)`
    ///
    /// Outside a batch this does nothing. I/O failures while appending are
    /// logged, counted in [`append_failures`](Self::append_failures) and
    /// otherwise ignored: the database may be left inconsistent and replay
    /// resolves it on restart. Fields the frame layout cannot carry are
    /// still rejected.
    pub fn log_set_pos(&self, position: u64, value: i64) -> Result<()> {
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return Ok(());
        };

        match writer.append(&LogRecord::entry(position, value)) {
            Ok(()) => Ok(()),
            Err(e @ FlatDbError::ValueOutOfRange { .. }) => Err(e),
            Err(e) => {
                self.append_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    "Failed to log slot {} in {}: {}; database may be inconsistent until restart",
                    position,
                    self.path.display(),
                    e
                );
                Ok(())
            }
        }
    }

    /// Append an End frame, force the log to disk and close it
    pub fn end_log(&self) -> Result<()> {
        let mut guard = self.writer.lock();
        let mut writer = guard.take().ok_or(FlatDbError::UnmatchedBatchEnd)?;

        writer.append(&LogRecord::end())?;
        writer.force()?;
        tracing::trace!("Committed batch of {} frames to {}", writer.frames_written(), self.path.display());
        writer.close()
    }

    pub fn is_batch_open(&self) -> bool {
        self.writer.lock().is_some()
    }

    /// Number of entry appends that failed and were swallowed
    pub fn append_failures(&self) -> u64 {
        self.append_failures.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Log file management
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn log_exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the log file; a missing file is not an error
    pub fn delete_log(&self) -> Result<()> {
        if self.is_batch_open() {
            return Err(FlatDbError::BatchReentrancy);
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Deleted log {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Replay
    // =========================================================================

    /// Re-apply every committed batch of a leftover log, then delete it
    ///
    /// Corruption never fails replay; it truncates it, and the log is deleted
    /// afterwards. Errors from the target's `save` and from reading the file
    /// are the exception: they are returned and the log is kept on disk, so
    /// the committed batches it holds can be replayed by a later attempt
    /// rather than lost.
    pub fn replay<T: LogTarget + ?Sized>(&self, target: &mut T) -> Result<ReplayReport> {
        if self.is_batch_open() {
            return Err(FlatDbError::BatchReentrancy);
        }
        if !self.log_exists() {
            return Ok(ReplayReport::new(ReplayOutcome::NoLog));
        }

        tracing::info!("Replaying log {}", self.path.display());
        let report = self.replay_frames(target)?;
        self.delete_log()?;

        match &report.outcome {
            ReplayOutcome::Corrupt { reason } => tracing::warn!(
                "Log replay stopped early ({}): {} batches, {} entries applied, {} discarded",
                reason,
                report.batches_applied,
                report.entries_applied,
                report.entries_discarded
            ),
            outcome => tracing::info!(
                "Log replay {:?}: {} batches, {} entries applied, {} discarded",
                outcome,
                report.batches_applied,
                report.entries_applied,
                report.entries_discarded
            ),
        }

        Ok(report)
    }

    fn replay_frames<T: LogTarget + ?Sized>(&self, target: &mut T) -> Result<ReplayReport> {
        let mut reader = LogReader::open(&self.path, self.layout)?;
        let mut report = ReplayReport::new(ReplayOutcome::Empty);
        let mut in_batch = false;
        let mut pending: Vec<(u64, i64)> = Vec::new();
        let mut frames = 0u64;

        let corrupt = |reason: String| ReplayOutcome::Corrupt { reason };

        loop {
            let record = match reader.next_frame() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(FlatDbError::TruncatedFrame { offset, bytes }) => {
                    // Torn final write: behaves like end of file
                    tracing::warn!("Ignoring {} trailing bytes at offset {}", bytes, offset);
                    break;
                }
                Err(e @ FlatDbError::MalformedFrame { .. }) => {
                    target.save()?;
                    report.entries_discarded += pending.len() as u64;
                    report.outcome = corrupt(e.to_string());
                    return Ok(report);
                }
                Err(e) => return Err(e),
            };
            frames += 1;

            match (record.record_type, in_batch) {
                (RecordType::Begin, false) => {
                    in_batch = true;
                    pending.clear();
                }
                (RecordType::Begin, true) => {
                    report.entries_discarded += pending.len() as u64;
                    report.outcome = corrupt(format!("nested Begin at frame {}", frames - 1));
                    return Ok(report);
                }
                (RecordType::Entry, true) => pending.push((record.position, record.value)),
                (RecordType::Entry, false) => {
                    report.outcome = corrupt(format!("Entry outside a batch at frame {}", frames - 1));
                    return Ok(report);
                }
                (RecordType::End, true) => {
                    // A batch is applied whole or not at all
                    let rejected = pending.iter().find_map(|&(position, value)| {
                        target
                            .check_log_entry(position, value)
                            .err()
                            .map(|e| (position, e))
                    });
                    if let Some((position, e)) = rejected {
                        report.entries_discarded += pending.len() as u64;
                        report.outcome = corrupt(format!("rejected entry for slot {}: {}", position, e));
                        return Ok(report);
                    }
                    for (index, &(position, value)) in pending.iter().enumerate() {
                        if let Err(e) = target.process_log_entry(position, value) {
                            // Partially applied: leave the file at the last saved batch
                            report.entries_discarded += (pending.len() - index) as u64;
                            report.outcome = corrupt(format!("failed entry for slot {}: {}", position, e));
                            return Ok(report);
                        }
                        report.entries_applied += 1;
                    }
                    target.save()?;
                    report.batches_applied += 1;
                    pending.clear();
                    in_batch = false;
                }
                (RecordType::End, false) => {
                    report.outcome = corrupt(format!("End outside a batch at frame {}", frames - 1));
                    return Ok(report);
                }
            }
        }

        report.outcome = if frames == 0 {
            ReplayOutcome::Empty
        } else if in_batch {
            report.entries_discarded += pending.len() as u64;
            ReplayOutcome::CrashedBatchDiscarded
        } else {
            ReplayOutcome::Clean
        };
        Ok(report)
    }
}
