//! Binary Codec Module
//!
//! Fixed-width big-endian packing shared by the position tables and the
//! write-ahead log frames.
//!
//! ## Supported Widths
//! ```text
//! ┌──────────────┬───────┬──────────────────────────────────────┐
//! │ Type         │ Bytes │ Notes                                │
//! ├──────────────┼───────┼──────────────────────────────────────┤
//! │ bool         │ 1     │ 0 = false, anything else = true      │
//! │ u16 / i16    │ 2     │                                      │
//! │ u32 / i32    │ 4     │                                      │
//! │ u64 / i64    │ 8     │                                      │
//! │ f32 / f64    │ 4 / 8 │ IEEE-754 bits of the integer form    │
//! │ long5        │ 5     │ 40-bit two's complement, [-2^39,2^39)│
//! └──────────────┴───────┴──────────────────────────────────────┘
//! ```
//!
//! Slice functions live in [`binary`]; stream extensions over `std::io`
//! live in [`stream`].

pub mod binary;
pub mod stream;

pub use binary::*;
pub use stream::{ReadBinaryExt, WriteBinaryExt};

/// Size in bytes of a packed long5 value
pub const LONG5_SIZE: usize = 5;

/// Smallest value representable as long5 (-2^39)
pub const LONG5_MIN: i64 = -(1 << 39);

/// Largest value representable as long5 (2^39 - 1)
pub const LONG5_MAX: i64 = (1 << 39) - 1;

/// Check that `value` fits the 40-bit signed range
pub fn check_long5(value: i64) -> crate::Result<()> {
    if (LONG5_MIN..=LONG5_MAX).contains(&value) {
        Ok(())
    } else {
        Err(crate::FlatDbError::out_of_range(value, LONG5_MIN, LONG5_MAX))
    }
}
