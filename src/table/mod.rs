//! Position Table Module
//!
//! Fixed-length arrays of packed big-endian slots that hold offsets for an
//! external open-addressing hash structure.
//!
//! ## Variants
//! ```text
//! ┌──────────────────────┬──────────┬──────────────────┬────────────────────┐
//! │ Table                │ Slot     │ Medium           │ Dirty tracking     │
//! ├──────────────────────┼──────────┼──────────────────┼────────────────────┤
//! │ Int32Table           │ 4 bytes  │ Vec<i32>         │ modified flag      │
//! │ LongTable            │ 8 bytes  │ Vec<i64>         │ modified flag      │
//! │ UInt40Table          │ 5 bytes  │ packed Vec<u8>   │ dirty-page bitset  │
//! │ MemoryMappedTable    │ 5 or 8   │ mapped file      │ modified flag      │
//! └──────────────────────┴──────────┴──────────────────┴────────────────────┘
//! ```
//!
//! ## Index Contract
//! Slot indices outside `[0, len)` are programming errors: every variant
//! panics rather than touching neighbouring memory. Tables never resize.

mod int32;
mod long;
mod mapped;
mod scatter;
mod uint40;

pub use int32::Int32Table;
pub use long::LongTable;
pub use mapped::{MemoryMappedTable, WARM_UP_STRIDE};
pub use scatter::MAX_MAP_CHUNK;
pub use uint40::UInt40Table;

use std::fs::File;
use std::io::Read;

use bytes::Buf;

use crate::error::{FlatDbError, Result};

/// Slot width of a memory-mapped table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedSlotWidth {
    /// 5-byte long5 slots
    Long5,
    /// 8-byte i64 slots
    Long8,
}

impl MappedSlotWidth {
    pub fn bytes(self) -> usize {
        match self {
            MappedSlotWidth::Long5 => 5,
            MappedSlotWidth::Long8 => 8,
        }
    }
}

/// Slot width and storage medium of a position table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Int32,
    Long,
    UInt40,
    MemoryMapped { slot_width: MappedSlotWidth },
}

impl TableKind {
    /// Bytes per slot on disk
    pub fn slot_width(self) -> usize {
        match self {
            TableKind::Int32 => 4,
            TableKind::Long => 8,
            TableKind::UInt40 => 5,
            TableKind::MemoryMapped { slot_width } => slot_width.bytes(),
        }
    }

    /// Significant bits of a stored value
    pub fn value_bits(self) -> u32 {
        self.slot_width() as u32 * 8
    }
}

/// Common contract of every position table variant
pub trait Table: Send {
    /// Variant of this table
    fn kind(&self) -> TableKind;

    /// Number of slots
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per slot on disk
    fn slot_width(&self) -> usize {
        self.kind().slot_width()
    }

    /// Value stored at `index`, or zero if never written
    ///
    /// # Panics
    /// If `index >= len()`.
    fn get(&self, index: usize) -> i64;

    /// Store `value` at `index`
    ///
    /// Values the slot cannot represent are rejected (40-bit variants) or
    /// reduced to the slot width (Int32 keeps the low 32 bits).
    ///
    /// # Panics
    /// If `index >= len()`.
    fn set(&mut self, index: usize, value: i64) -> Result<()>;

    /// Store `value` in every slot
    fn fill(&mut self, value: i64) -> Result<()>;

    /// Zero every slot
    fn fill_zero(&mut self);

    /// Whether anything changed since dirty tracking was last cleared
    fn is_modified(&self) -> bool;

    /// Rewrite the whole table into `file` starting at `offset`
    fn flush(&mut self, file: &File, offset: u64) -> Result<()>;

    /// Bring `file` up to date, rewriting everything or only what changed
    fn update(&mut self, file: &File, offset: u64) -> Result<()>;

    /// Bulk-load the first `count` slots from a packed big-endian stream
    fn load(&mut self, reader: &mut dyn Read, count: usize) -> Result<()>;

    /// Forget which slots changed
    fn clear_dirty_tracking(&mut self);

    /// Force table content to stable storage where the medium needs it
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

#[inline]
pub(crate) fn check_index(index: usize, len: usize) {
    assert!(index < len, "slot index {} out of range for table of {} slots", index, len);
}

pub(crate) fn check_load_count(count: usize, len: usize) -> Result<()> {
    if count > len {
        return Err(FlatDbError::TableSize(format!(
            "cannot load {} slots into a table of {} slots",
            count, len
        )));
    }
    Ok(())
}

/// Read a sign-extended big-endian slot of `width` bytes
#[inline]
pub(crate) fn read_slot(buf: &[u8], index: usize, width: usize) -> i64 {
    let start = index * width;
    let mut r = &buf[start..start + width];
    r.get_int(width)
}

/// Allocate a zeroed vector, reporting allocation failure as a table error
pub(crate) fn zeroed_vec<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|e| {
        FlatDbError::TableSize(format!("cannot allocate {} slots: {}", len, e))
    })?;
    v.resize(len, T::default());
    Ok(v)
}
