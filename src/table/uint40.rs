//! 5-byte in-process table with dirty-page tracking
//!
//! Slots are packed as long5 in one contiguous byte array. The array is cut
//! into pages of `page_slots` slots; a bitset records which pages changed
//! since the last flush so `update` can write only those.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::codec::{self, ReadBinaryExt, LONG5_SIZE};
use crate::config::{DEFAULT_DIRTY_PAGE_SLOTS, DEFAULT_FULL_REWRITE_RATIO};
use crate::error::{FlatDbError, Result};

use super::scatter::scatter;
use super::{check_index, check_load_count, read_slot, zeroed_vec, Table, TableKind};

/// Bitset of dirty pages plus a running count
#[derive(Debug, Clone)]
struct PageTracker {
    bits: Vec<u64>,
    pages: usize,
    dirty: usize,
}

impl PageTracker {
    fn new(pages: usize) -> Self {
        Self {
            bits: vec![0; pages.div_ceil(64)],
            pages,
            dirty: 0,
        }
    }

    fn mark(&mut self, page: usize) {
        let (word, bit) = (page / 64, 1u64 << (page % 64));
        if self.bits[word] & bit == 0 {
            self.bits[word] |= bit;
            self.dirty += 1;
        }
    }

    fn mark_all(&mut self) {
        for page in 0..self.pages {
            self.mark(page);
        }
    }

    fn clear(&mut self) {
        self.bits.fill(0);
        self.dirty = 0;
    }

    fn ratio(&self) -> f64 {
        if self.pages == 0 {
            return 0.0;
        }
        self.dirty as f64 / self.pages as f64
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.pages).filter(move |p| self.bits[p / 64] & (1u64 << (p % 64)) != 0)
    }
}

/// Packed array of signed 40-bit slots
pub struct UInt40Table {
    data: Vec<u8>,
    len: usize,
    page_slots: usize,
    full_rewrite_ratio: f64,
    tracker: PageTracker,
}

impl UInt40Table {
    /// Allocate a zero-filled table with default paging
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_paging(capacity, DEFAULT_DIRTY_PAGE_SLOTS, DEFAULT_FULL_REWRITE_RATIO)
    }

    /// Allocate a zero-filled table with explicit page size and rewrite threshold
    ///
    /// `page_slots` is clamped to at least one slot.
    pub fn with_paging(capacity: usize, page_slots: usize, full_rewrite_ratio: f64) -> Result<Self> {
        let page_slots = page_slots.max(1);
        let pages = capacity.div_ceil(page_slots);
        let bytes = capacity
            .checked_mul(LONG5_SIZE)
            .ok_or_else(|| FlatDbError::TableSize(format!("{} slots overflow the address space", capacity)))?;
        Ok(Self {
            data: zeroed_vec(bytes)?,
            len: capacity,
            page_slots,
            full_rewrite_ratio,
            tracker: PageTracker::new(pages),
        })
    }

    /// Number of pages modified since the last flush
    pub fn modified_page_count(&self) -> usize {
        self.tracker.dirty
    }

    /// Total number of tracking pages
    pub fn page_count(&self) -> usize {
        self.tracker.pages
    }

    fn write_all(&mut self, file: &File, offset: u64) -> Result<()> {
        let data = &self.data;
        scatter(file, offset, self.len, LONG5_SIZE, |first, chunk| {
            let start = first * LONG5_SIZE;
            chunk.copy_from_slice(&data[start..start + chunk.len()]);
        })?;
        self.tracker.clear();
        Ok(())
    }

    fn write_dirty_pages(&mut self, file: &File, offset: u64) -> Result<()> {
        let page_bytes = self.page_slots * LONG5_SIZE;
        let mut out = file;
        let mut written = 0usize;
        for page in self.tracker.iter() {
            let start = page * page_bytes;
            let end = (start + page_bytes).min(self.data.len());
            out.seek(SeekFrom::Start(offset + start as u64))?;
            out.write_all(&self.data[start..end])?;
            written += 1;
        }
        tracing::debug!("Pages written: {} of {}", written, self.tracker.pages);
        self.tracker.clear();
        Ok(())
    }
}

impl Table for UInt40Table {
    fn kind(&self) -> TableKind {
        TableKind::UInt40
    }

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> i64 {
        check_index(index, self.len);
        read_slot(&self.data, index, LONG5_SIZE)
    }

    fn set(&mut self, index: usize, value: i64) -> Result<()> {
        check_index(index, self.len);
        codec::put_long5(&mut self.data, index * LONG5_SIZE, value)?;
        self.tracker.mark(index / self.page_slots);
        Ok(())
    }

    fn fill(&mut self, value: i64) -> Result<()> {
        let packed = codec::encode_long5(value)?;
        for slot in self.data.chunks_exact_mut(LONG5_SIZE) {
            slot.copy_from_slice(&packed);
        }
        self.tracker.mark_all();
        Ok(())
    }

    fn fill_zero(&mut self) {
        self.data.fill(0);
        self.tracker.mark_all();
    }

    fn is_modified(&self) -> bool {
        self.tracker.dirty > 0
    }

    fn flush(&mut self, file: &File, offset: u64) -> Result<()> {
        self.write_all(file, offset)
    }

    /// Full rewrite above the dirty ratio threshold, page writes below it
    fn update(&mut self, file: &File, offset: u64) -> Result<()> {
        if self.tracker.dirty == 0 {
            return Ok(());
        }
        if self.tracker.ratio() > self.full_rewrite_ratio {
            tracing::debug!(
                "{} of {} pages dirty, rewriting whole table",
                self.tracker.dirty,
                self.tracker.pages
            );
            self.write_all(file, offset)
        } else {
            self.write_dirty_pages(file, offset)
        }
    }

    fn load(&mut self, reader: &mut dyn Read, count: usize) -> Result<()> {
        check_load_count(count, self.len)?;
        for index in 0..count {
            let value = reader.read_long5()?;
            codec::put_long5(&mut self.data, index * LONG5_SIZE, value)?;
        }
        self.tracker.clear();
        Ok(())
    }

    fn clear_dirty_tracking(&mut self) {
        self.tracker.clear();
    }
}
