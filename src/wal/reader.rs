//! WAL Reader
//!
//! Reads frames back sequentially from a log file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::codec::stream::read_up_to;
use crate::error::{FlatDbError, Result};

use super::{FrameLayout, LogRecord, FRAME_SIZE};

/// Reads frames from a log file
pub struct LogReader {
    reader: BufReader<File>,
    layout: FrameLayout,
    offset: u64,
    done: bool,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path, layout: FrameLayout) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            layout,
            offset: 0,
            done: false,
        })
    }

    /// Read the next frame
    ///
    /// - `Ok(None)` at a clean end of file
    /// - `TruncatedFrame` when the file ends inside a frame
    /// - `MalformedFrame` when the record type is unknown
    pub fn next_frame(&mut self) -> Result<Option<LogRecord>> {
        let mut frame = [0u8; FRAME_SIZE];
        let filled = read_up_to(&mut self.reader, &mut frame)?;

        if filled == 0 {
            return Ok(None);
        }
        if filled < FRAME_SIZE {
            return Err(FlatDbError::TruncatedFrame { offset: self.offset, bytes: filled });
        }

        let record = LogRecord::decode(&frame, self.layout, self.offset)?;
        self.offset += FRAME_SIZE as u64;
        Ok(Some(record))
    }

    /// Byte offset of the next frame
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Yields frames until end of file; the first error ends iteration
impl Iterator for LogReader {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_frame() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
