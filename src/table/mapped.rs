//! Memory-mapped table
//!
//! Slots live directly in a mapped file region, so content is already in the
//! file: `flush` and `update` have nothing to copy and `sync` forces the
//! mapping to storage. The mapping is released when the table is dropped.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::codec::{self, ReadBinaryExt};
use crate::error::{FlatDbError, Result};

use super::{check_index, check_load_count, read_slot, MappedSlotWidth, Table, TableKind};

/// Bytes between touched addresses during warm-up
pub const WARM_UP_STRIDE: usize = 512;

/// Table whose slots are the bytes of a mapped file
pub struct MemoryMappedTable {
    map: MmapMut,
    _file: File,
    path: PathBuf,
    len: usize,
    slot_width: MappedSlotWidth,
    modified: bool,
}

impl MemoryMappedTable {
    /// Map `path` (created and zero-extended when shorter) as `capacity` slots
    ///
    /// With `warm_up`, one byte per [`WARM_UP_STRIDE`] is read so the page
    /// cache is populated before random access starts.
    pub fn open(
        path: impl AsRef<Path>,
        capacity: usize,
        slot_width: MappedSlotWidth,
        warm_up: bool,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if capacity == 0 {
            return Err(FlatDbError::TableSize("cannot map a table of zero slots".into()));
        }
        let size = capacity
            .checked_mul(slot_width.bytes())
            .ok_or_else(|| FlatDbError::TableSize(format!("{} slots overflow the address space", capacity)))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.metadata()?.len() < size as u64 {
            file.set_len(size as u64)?;
        }

        // SAFETY: the file stays open for the life of the mapping and the
        // store's exclusive lock keeps other processes from resizing it.
        let map = unsafe { MmapOptions::new().len(size).map_mut(&file) }
            .map_err(|e| FlatDbError::TableSize(format!("cannot map {} bytes of {}: {}", size, path.display(), e)))?;

        let table = Self {
            map,
            _file: file,
            path,
            len: capacity,
            slot_width,
            modified: false,
        };

        if warm_up {
            table.warm_up();
        }

        Ok(table)
    }

    /// Path of the mapped file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Touch one byte per stride, logging progress every tenth
    pub fn warm_up(&self) -> u8 {
        let total = self.map.len();
        let tenth = (total / 10).max(1);
        let mut next_report = tenth;
        let mut acc = 0u8;

        for offset in (0..total).step_by(WARM_UP_STRIDE) {
            acc = acc.wrapping_add(self.map[offset]);
            if offset >= next_report {
                tracing::debug!("Warm-up {}: {}%", self.path.display(), offset * 100 / total);
                next_report += tenth;
            }
        }

        tracing::debug!("Warm-up {}: done", self.path.display());
        std::hint::black_box(acc)
    }

    fn width(&self) -> usize {
        self.slot_width.bytes()
    }

    fn write_slot(&mut self, index: usize, value: i64) -> Result<()> {
        let offset = index * self.width();
        match self.slot_width {
            MappedSlotWidth::Long5 => codec::put_long5(&mut self.map, offset, value),
            MappedSlotWidth::Long8 => codec::put_i64(&mut self.map, offset, value),
        }
    }
}

impl Table for MemoryMappedTable {
    fn kind(&self) -> TableKind {
        TableKind::MemoryMapped { slot_width: self.slot_width }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> i64 {
        check_index(index, self.len);
        read_slot(&self.map, index, self.width())
    }

    fn set(&mut self, index: usize, value: i64) -> Result<()> {
        check_index(index, self.len);
        self.write_slot(index, value)?;
        self.modified = true;
        Ok(())
    }

    fn fill(&mut self, value: i64) -> Result<()> {
        if self.slot_width == MappedSlotWidth::Long5 {
            codec::check_long5(value)?;
        }
        for index in 0..self.len {
            self.write_slot(index, value)?;
        }
        self.modified = true;
        Ok(())
    }

    fn fill_zero(&mut self) {
        self.map.fill(0);
        self.modified = true;
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn flush(&mut self, _file: &File, _offset: u64) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, _file: &File, _offset: u64) -> Result<()> {
        Ok(())
    }

    fn load(&mut self, reader: &mut dyn Read, count: usize) -> Result<()> {
        check_load_count(count, self.len)?;
        for index in 0..count {
            let value = match self.slot_width {
                MappedSlotWidth::Long5 => reader.read_long5()?,
                MappedSlotWidth::Long8 => reader.read_i64_be()?,
            };
            self.write_slot(index, value)?;
        }
        self.modified = false;
        Ok(())
    }

    fn clear_dirty_tracking(&mut self) {
        self.modified = false;
    }

    fn sync(&self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }
}
