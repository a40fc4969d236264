//! Slice codec
//!
//! Packs and unpacks big-endian integers at an offset inside a byte slice.
//! Every function checks the window first, so a short buffer yields
//! `EndOfData` instead of a panic.

use bytes::{Buf, BufMut};

use crate::error::{FlatDbError, Result};

use super::{check_long5, LONG5_SIZE};

fn window(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let available = buf.len().saturating_sub(offset);
    if available < len {
        return Err(FlatDbError::EndOfData { needed: len, available });
    }
    Ok(&buf[offset..offset + len])
}

fn window_mut(buf: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    let available = buf.len().saturating_sub(offset);
    if available < len {
        return Err(FlatDbError::EndOfData { needed: len, available });
    }
    Ok(&mut buf[offset..offset + len])
}

macro_rules! fixed_width {
    ($put:ident, $get:ident, $ty:ty, $len:expr, $buf_put:ident, $buf_get:ident) => {
        #[doc = concat!("Write a big-endian `", stringify!($ty), "` at `offset`")]
        pub fn $put(buf: &mut [u8], offset: usize, value: $ty) -> Result<()> {
            let mut w = window_mut(buf, offset, $len)?;
            w.$buf_put(value);
            Ok(())
        }

        #[doc = concat!("Read a big-endian `", stringify!($ty), "` at `offset`")]
        pub fn $get(buf: &[u8], offset: usize) -> Result<$ty> {
            let mut r = window(buf, offset, $len)?;
            Ok(r.$buf_get())
        }
    };
}

fixed_width!(put_u16, get_u16, u16, 2, put_u16, get_u16);
fixed_width!(put_i16, get_i16, i16, 2, put_i16, get_i16);
fixed_width!(put_u32, get_u32, u32, 4, put_u32, get_u32);
fixed_width!(put_i32, get_i32, i32, 4, put_i32, get_i32);
fixed_width!(put_u64, get_u64, u64, 8, put_u64, get_u64);
fixed_width!(put_i64, get_i64, i64, 8, put_i64, get_i64);
fixed_width!(put_f32, get_f32, f32, 4, put_f32, get_f32);
fixed_width!(put_f64, get_f64, f64, 8, put_f64, get_f64);

/// Write a bool as one byte (1 or 0)
pub fn put_bool(buf: &mut [u8], offset: usize, value: bool) -> Result<()> {
    let mut w = window_mut(buf, offset, 1)?;
    w.put_u8(u8::from(value));
    Ok(())
}

/// Read a bool; any non-zero byte is true
pub fn get_bool(buf: &[u8], offset: usize) -> Result<bool> {
    let mut r = window(buf, offset, 1)?;
    Ok(r.get_u8() != 0)
}

/// Write a signed 40-bit value as 5 big-endian bytes
///
/// Values outside `[-2^39, 2^39)` are rejected, never truncated.
pub fn put_long5(buf: &mut [u8], offset: usize, value: i64) -> Result<()> {
    check_long5(value)?;
    let mut w = window_mut(buf, offset, LONG5_SIZE)?;
    w.put_int(value, LONG5_SIZE);
    Ok(())
}

/// Read 5 big-endian bytes as a sign-extended 40-bit value
pub fn get_long5(buf: &[u8], offset: usize) -> Result<i64> {
    let mut r = window(buf, offset, LONG5_SIZE)?;
    Ok(r.get_int(LONG5_SIZE))
}

/// Encode a long5 value into a fresh 5-byte array
pub fn encode_long5(value: i64) -> Result<[u8; LONG5_SIZE]> {
    let mut out = [0u8; LONG5_SIZE];
    put_long5(&mut out, 0, value)?;
    Ok(out)
}

/// Decode a 5-byte array produced by [`encode_long5`]
pub fn decode_long5(bytes: &[u8; LONG5_SIZE]) -> i64 {
    let mut r = &bytes[..];
    r.get_int(LONG5_SIZE)
}
