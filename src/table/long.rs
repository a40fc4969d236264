//! 8-byte in-process table

use std::fs::File;
use std::io::Read;

use crate::codec::ReadBinaryExt;
use crate::error::Result;

use super::scatter::scatter;
use super::{check_index, check_load_count, zeroed_vec, Table, TableKind};

/// Packed array of 64-bit slots
pub struct LongTable {
    data: Vec<i64>,
    modified: bool,
}

impl LongTable {
    /// Allocate a zero-filled table of `capacity` slots
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            data: zeroed_vec(capacity)?,
            modified: false,
        })
    }

    fn write_all(&mut self, file: &File, offset: u64) -> Result<()> {
        let data = &self.data;
        scatter(file, offset, data.len(), 8, |first, chunk| {
            for (dst, v) in chunk.chunks_exact_mut(8).zip(&data[first..]) {
                dst.copy_from_slice(&v.to_be_bytes());
            }
        })?;
        self.modified = false;
        Ok(())
    }
}

impl Table for LongTable {
    fn kind(&self) -> TableKind {
        TableKind::Long
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: usize) -> i64 {
        check_index(index, self.data.len());
        self.data[index]
    }

    fn set(&mut self, index: usize, value: i64) -> Result<()> {
        check_index(index, self.data.len());
        self.data[index] = value;
        self.modified = true;
        Ok(())
    }

    fn fill(&mut self, value: i64) -> Result<()> {
        self.data.fill(value);
        self.modified = true;
        Ok(())
    }

    fn fill_zero(&mut self) {
        self.data.fill(0);
        self.modified = true;
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn flush(&mut self, file: &File, offset: u64) -> Result<()> {
        self.write_all(file, offset)
    }

    fn update(&mut self, file: &File, offset: u64) -> Result<()> {
        self.write_all(file, offset)
    }

    fn load(&mut self, reader: &mut dyn Read, count: usize) -> Result<()> {
        check_load_count(count, self.data.len())?;
        for slot in self.data.iter_mut().take(count) {
            *slot = reader.read_i64_be()?;
        }
        self.modified = false;
        Ok(())
    }

    fn clear_dirty_tracking(&mut self) {
        self.modified = false;
    }
}
