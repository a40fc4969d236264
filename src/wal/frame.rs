//! WAL Frame definitions
//!
//! Every record is exactly [`FRAME_SIZE`] bytes. The split of the twelve
//! payload bytes between position and value follows the protected table.

use crate::codec;
use crate::error::{FlatDbError, Result};

/// Serialized size of every frame
pub const FRAME_SIZE: usize = 16;

/// Kind of a log record, stored as a big-endian u32 tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RecordType {
    Begin = 0,
    Entry = 1,
    End = 2,
}

impl RecordType {
    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(RecordType::Begin),
            1 => Some(RecordType::Entry),
            2 => Some(RecordType::End),
            _ => None,
        }
    }
}

/// Byte layout of the position and value fields
///
/// ```text
/// PosU32ValU64: [0:4) type | [4:8)  position u32 | [8:16)  value u64
/// PosU64ValU32: [0:4) type | [4:12) position u64 | [12:16) value u32
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameLayout {
    #[default]
    PosU32ValU64,
    PosU64ValU32,
}

impl FrameLayout {
    /// Largest position the layout can carry
    pub fn max_position(self) -> u64 {
        match self {
            FrameLayout::PosU32ValU64 => u64::from(u32::MAX),
            FrameLayout::PosU64ValU32 => u64::MAX,
        }
    }

    /// Width of the value field in bits
    pub fn value_bits(self) -> u32 {
        match self {
            FrameLayout::PosU32ValU64 => 64,
            FrameLayout::PosU64ValU32 => 32,
        }
    }
}

/// One write-ahead log record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord {
    pub record_type: RecordType,
    pub position: u64,
    pub value: i64,
}

impl LogRecord {
    pub fn begin() -> Self {
        Self { record_type: RecordType::Begin, position: 0, value: 0 }
    }

    pub fn entry(position: u64, value: i64) -> Self {
        Self { record_type: RecordType::Entry, position, value }
    }

    pub fn end() -> Self {
        Self { record_type: RecordType::End, position: 0, value: 0 }
    }

    /// Serialize into a 16-byte frame
    ///
    /// Fields that do not fit the layout are rejected. With `PosU64ValU32`
    /// the value keeps its low 32 bits, so both `[0, 2^32)` and negative
    /// 32-bit values are accepted.
    pub fn encode(&self, layout: FrameLayout) -> Result<[u8; FRAME_SIZE]> {
        let mut frame = [0u8; FRAME_SIZE];
        codec::put_u32(&mut frame, 0, self.record_type.tag())?;

        match layout {
            FrameLayout::PosU32ValU64 => {
                let position = u32::try_from(self.position)
                    .map_err(|_| FlatDbError::out_of_range(self.position, 0, u32::MAX))?;
                codec::put_u32(&mut frame, 4, position)?;
                codec::put_u64(&mut frame, 8, self.value as u64)?;
            }
            FrameLayout::PosU64ValU32 => {
                if self.value < i64::from(i32::MIN) || self.value > i64::from(u32::MAX) {
                    return Err(FlatDbError::out_of_range(self.value, i32::MIN, u32::MAX));
                }
                codec::put_u64(&mut frame, 4, self.position)?;
                codec::put_u32(&mut frame, 12, self.value as u32)?;
            }
        }

        Ok(frame)
    }

    /// Parse a frame read at file `offset`
    ///
    /// A 32-bit value field is zero-extended.
    pub fn decode(frame: &[u8; FRAME_SIZE], layout: FrameLayout, offset: u64) -> Result<Self> {
        let tag = codec::get_u32(frame, 0)?;
        let record_type =
            RecordType::from_tag(tag).ok_or(FlatDbError::MalformedFrame { tag, offset })?;

        let (position, value) = match layout {
            FrameLayout::PosU32ValU64 => (
                u64::from(codec::get_u32(frame, 4)?),
                codec::get_u64(frame, 8)? as i64,
            ),
            FrameLayout::PosU64ValU32 => (
                codec::get_u64(frame, 4)?,
                i64::from(codec::get_u32(frame, 12)?),
            ),
        };

        Ok(Self { record_type, position, value })
    }
}
