//!
//! Read-side byte primitives: integers, floats, strings, raw blocks, all honoring
//! the active endianness and filter chain.
//!
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use crate::error::IoError;
use crate::filters::ChecksumCalculator;
use crate::filters::XorCalculator;

use super::Stream;

/// Reads primitive values out of a [`Stream`], applying the XOR filter (if
/// installed) to every raw byte, then feeding the resulting logical byte to
/// the checksum tap (if installed).
pub struct Reader
{
    stream: Box<dyn Stream>,
    pub is_little_endian: bool,
    xor: Option<Box<dyn XorCalculator>>,
    checksum: Option<Box<dyn ChecksumCalculator>>,
    /// Set by [`Reader::read_bool`], consumed by the generic
    /// `serialize::<T>()` caller so it can emit the `MalformedBool` warning
    /// without needing to know `T` is `bool` at the type-system level.
    last_bool_malformed: Option<bool>,
}

impl Reader
{
    pub fn new(stream: Box<dyn Stream>, is_little_endian: bool) -> Self
    {
        Self { stream, is_little_endian, xor: None, checksum: None, last_bool_malformed: None }
    }

    /// Takes and resets the malformed-bool flag from the most recent
    /// [`Reader::read_bool`] call, if one hasn't already been consumed.
    pub fn take_last_bool_malformed(&mut self) -> Option<bool>
    {
        self.last_bool_malformed.take()
    }

    pub fn position(&mut self) -> std::io::Result<u64>
    {
        self.stream.stream_position()
    }

    pub fn seek(&mut self, position: u64) -> std::io::Result<u64>
    {
        self.stream.seek(SeekFrom::Start(position))
    }

    pub fn length(&mut self) -> std::io::Result<u64>
    {
        let current = self.stream.stream_position()?;
        let length = self.stream.seek(SeekFrom::End(0))?;
        self.stream.seek(SeekFrom::Start(current))?;
        Ok(length)
    }

    /// Installs an XOR filter, replacing any previously active one. Returns the
    /// filter that was previously installed so the caller can restore it on scope
    /// exit — nesting replaces, it does not compose.
    pub fn begin_xor(&mut self, filter: Box<dyn XorCalculator>) -> Option<Box<dyn XorCalculator>>
    {
        self.xor.replace(filter)
    }

    pub fn end_xor(&mut self, previous: Option<Box<dyn XorCalculator>>)
    {
        self.xor = previous;
    }

    pub fn begin_checksum(&mut self, calculator: Box<dyn ChecksumCalculator>) -> Option<Box<dyn ChecksumCalculator>>
    {
        self.checksum.replace(calculator)
    }

    /// Ends the checksum scope, returning the accumulated value and restoring
    /// whatever checksum calculator (if any) was active before.
    pub fn end_checksum(&mut self, previous: Option<Box<dyn ChecksumCalculator>>) -> u64
    {
        let finished = self.checksum.take();
        self.checksum = previous;
        finished.map(|c| c.value()).unwrap_or(0)
    }

    fn read_raw(&mut self, buf: &mut [u8]) -> Result<(), IoError>
    {
        let position = self.stream.stream_position().unwrap_or(0);

        self.stream.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                IoError::EndOfInput { position }
            } else {
                IoError::Io(e)
            }
        })?;

        if let Some(xor) = self.xor.as_mut() {
            for b in buf.iter_mut() {
                *b = xor.process_byte(*b);
            }
        }

        if let Some(checksum) = self.checksum.as_mut() {
            for &b in buf.iter() {
                checksum.process_byte(b);
            }
        }

        Ok(())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, IoError>
    {
        let mut buf = vec![0u8; count];
        self.read_raw(&mut buf)?;
        Ok(buf)
    }

    pub fn read_bool(&mut self) -> Result<(bool, bool), IoError>
    {
        let byte = self.read_u8()?;
        let malformed = byte != 0 && byte != 1;
        self.last_bool_malformed = Some(malformed);
        Ok((byte != 0, malformed))
    }

    pub fn read_u8(&mut self) -> Result<u8, IoError>
    {
        let mut buf = [0u8; 1];
        self.read_raw(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, IoError>
    {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, IoError>
    {
        let mut buf = [0u8; 2];
        self.read_raw(&mut buf)?;
        Ok(if self.is_little_endian { u16::from_le_bytes(buf) } else { u16::from_be_bytes(buf) })
    }

    pub fn read_i16(&mut self) -> Result<i16, IoError>
    {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u24(&mut self) -> Result<u32, IoError>
    {
        let mut buf = [0u8; 3];
        self.read_raw(&mut buf)?;
        let mut widened = [0u8; 4];
        if self.is_little_endian {
            widened[..3].copy_from_slice(&buf);
            Ok(u32::from_le_bytes(widened))
        } else {
            widened[1..].copy_from_slice(&buf);
            Ok(u32::from_be_bytes(widened))
        }
    }

    pub fn read_i24(&mut self) -> Result<i32, IoError>
    {
        let value = self.read_u24()?;
        // sign-extend the 24th bit
        Ok(((value << 8) as i32) >> 8)
    }

    pub fn read_u32(&mut self) -> Result<u32, IoError>
    {
        let mut buf = [0u8; 4];
        self.read_raw(&mut buf)?;
        Ok(if self.is_little_endian { u32::from_le_bytes(buf) } else { u32::from_be_bytes(buf) })
    }

    pub fn read_i32(&mut self) -> Result<i32, IoError>
    {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, IoError>
    {
        let mut buf = [0u8; 8];
        self.read_raw(&mut buf)?;
        Ok(if self.is_little_endian { u64::from_le_bytes(buf) } else { u64::from_be_bytes(buf) })
    }

    pub fn read_i64(&mut self) -> Result<i64, IoError>
    {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, IoError>
    {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, IoError>
    {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads bytes until (and including) a `0x00` terminator, returning the bytes
    /// before the terminator.
    pub fn read_until_null(&mut self) -> Result<Vec<u8>, IoError>
    {
        let mut bytes = Vec::new();
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        Ok(bytes)
    }
}
