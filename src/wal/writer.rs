//! WAL Writer
//!
//! Appends frames to the log file, either one write per frame or batched
//! into a fixed-size page.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::{FrameLayout, LogRecord, FRAME_SIZE};

/// How frames reach the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// One write call per frame
    Immediate,

    /// Frames accumulate in a page of `page_size` bytes, written when full,
    /// on `force` and on `close`
    Paged { page_size: usize },
}

/// Appends frames to a log file
pub struct LogWriter {
    file: File,
    path: PathBuf,
    layout: FrameLayout,
    mode: WriteMode,
    page: Vec<u8>,
    frames_written: u64,
}

impl LogWriter {
    /// Open (creating if absent) a log file for append
    pub fn open(path: &Path, layout: FrameLayout, mode: WriteMode) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let page = match mode {
            WriteMode::Immediate => Vec::new(),
            WriteMode::Paged { page_size } => Vec::with_capacity(page_size.max(FRAME_SIZE)),
        };

        Ok(Self {
            file,
            path: path.to_path_buf(),
            layout,
            mode,
            page,
            frames_written: 0,
        })
    }

    /// Append one record
    ///
    /// Encoding errors are returned before anything is buffered or written.
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        let frame = record.encode(self.layout)?;

        match self.mode {
            WriteMode::Immediate => self.file.write_all(&frame)?,
            WriteMode::Paged { page_size } => {
                if self.page.len() + FRAME_SIZE > page_size.max(FRAME_SIZE) {
                    self.flush_page()?;
                }
                self.page.extend_from_slice(&frame);
            }
        }

        self.frames_written += 1;
        Ok(())
    }

    /// Write any buffered page to the file (no fsync)
    pub fn flush_page(&mut self) -> Result<()> {
        if self.page.is_empty() {
            return Ok(());
        }
        self.file.write_all(&self.page)?;
        self.page.clear();
        Ok(())
    }

    /// Drain the page and force the file to stable storage
    pub fn force(&mut self) -> Result<()> {
        self.flush_page()?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Drain the page and close the file
    pub fn close(mut self) -> Result<()> {
        self.flush_page()
    }

    /// Frames appended since open (buffered or not)
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Bytes still waiting in the page
    pub fn buffered_bytes(&self) -> usize {
        self.page.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush_page() {
            tracing::warn!("Dropping log writer {} with unflushed page: {}", self.path.display(), e);
        }
    }
}
