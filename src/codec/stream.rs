//! Stream codec
//!
//! Extension traits over `std::io::Read` / `std::io::Write` using the same
//! big-endian layout as the slice functions. A short read reports how many
//! bytes were actually available before end of stream.

use std::io::{ErrorKind, Read, Write};

use crate::error::{FlatDbError, Result};

use super::{binary, check_long5, LONG5_SIZE};

/// Fill `buf` from `reader`, stopping early only at end of stream
///
/// Returns the number of bytes filled.
pub(crate) fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Read exactly `N` bytes, reporting `EndOfData` on a short stream
fn read_array<R: Read + ?Sized, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    let filled = read_up_to(reader, &mut buf)?;
    if filled < N {
        return Err(FlatDbError::EndOfData { needed: N, available: filled });
    }
    Ok(buf)
}

/// Big-endian reads from any byte stream
pub trait ReadBinaryExt: Read {
    fn read_bool(&mut self) -> Result<bool> {
        let b: [u8; 1] = read_array(self)?;
        Ok(b[0] != 0)
    }

    fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(read_array(self)?))
    }

    fn read_i16_be(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(read_array(self)?))
    }

    fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(read_array(self)?))
    }

    fn read_i32_be(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(read_array(self)?))
    }

    fn read_u64_be(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(read_array(self)?))
    }

    fn read_i64_be(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(read_array(self)?))
    }

    fn read_f32_be(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32_be()?))
    }

    fn read_f64_be(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64_be()?))
    }

    fn read_long5(&mut self) -> Result<i64> {
        let b: [u8; LONG5_SIZE] = read_array(self)?;
        Ok(binary::decode_long5(&b))
    }
}

impl<R: Read + ?Sized> ReadBinaryExt for R {}

/// Big-endian writes to any byte sink
pub trait WriteBinaryExt: Write {
    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_all(&[u8::from(value)])?;
        Ok(())
    }

    fn write_u16_be(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_i16_be(&mut self, value: i16) -> Result<()> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_u32_be(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_i32_be(&mut self, value: i32) -> Result<()> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_u64_be(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_i64_be(&mut self, value: i64) -> Result<()> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_f32_be(&mut self, value: f32) -> Result<()> {
        self.write_u32_be(value.to_bits())
    }

    fn write_f64_be(&mut self, value: f64) -> Result<()> {
        self.write_u64_be(value.to_bits())
    }

    /// Rejects values outside the 40-bit signed range before writing anything
    fn write_long5(&mut self, value: i64) -> Result<()> {
        check_long5(value)?;
        self.write_all(&binary::encode_long5(value)?)?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteBinaryExt for W {}
