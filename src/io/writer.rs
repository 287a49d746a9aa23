//!
//! Write-side byte primitives, mirroring [`super::reader::Reader`].
//!
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;

use crate::error::IoError;
use crate::filters::ChecksumCalculator;
use crate::filters::XorCalculator;

use super::Stream;

pub struct Writer
{
    stream: Box<dyn Stream>,
    pub is_little_endian: bool,
    xor: Option<Box<dyn XorCalculator>>,
    checksum: Option<Box<dyn ChecksumCalculator>>,
}

impl Writer
{
    pub fn new(stream: Box<dyn Stream>, is_little_endian: bool) -> Self
    {
        Self { stream, is_little_endian, xor: None, checksum: None }
    }

    pub fn position(&mut self) -> std::io::Result<u64>
    {
        self.stream.stream_position()
    }

    pub fn seek(&mut self, position: u64) -> std::io::Result<u64>
    {
        self.stream.seek(SeekFrom::Start(position))
    }

    pub fn flush(&mut self) -> std::io::Result<()>
    {
        self.stream.flush()
    }

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

    pub fn end_checksum(&mut self, previous: Option<Box<dyn ChecksumCalculator>>) -> u64
    {
        let finished = self.checksum.take();
        self.checksum = previous;
        finished.map(|c| c.value()).unwrap_or(0)
    }

    fn write_raw(&mut self, buf: &[u8]) -> Result<(), IoError>
    {
        if let Some(checksum) = self.checksum.as_mut() {
            for &b in buf.iter() {
                checksum.process_byte(b);
            }
        }

        let mut encoded = buf.to_vec();
        if let Some(xor) = self.xor.as_mut() {
            for b in encoded.iter_mut() {
                *b = xor.process_byte(*b);
            }
        }

        self.stream.write_all(&encoded).map_err(IoError::Io)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), IoError>
    {
        self.write_raw(bytes)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), IoError>
    {
        self.write_u8(if value { 1 } else { 0 })
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), IoError>
    {
        self.write_raw(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> Result<(), IoError>
    {
        self.write_u8(value as u8)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), IoError>
    {
        let buf = if self.is_little_endian { value.to_le_bytes() } else { value.to_be_bytes() };
        self.write_raw(&buf)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<(), IoError>
    {
        self.write_u16(value as u16)
    }

    pub fn write_u24(&mut self, value: u32) -> Result<(), IoError>
    {
        let full = if self.is_little_endian { value.to_le_bytes() } else { value.to_be_bytes() };
        let buf = if self.is_little_endian { [full[0], full[1], full[2]] } else { [full[1], full[2], full[3]] };
        self.write_raw(&buf)
    }

    pub fn write_i24(&mut self, value: i32) -> Result<(), IoError>
    {
        self.write_u24((value as u32) & 0x00FF_FFFF)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), IoError>
    {
        let buf = if self.is_little_endian { value.to_le_bytes() } else { value.to_be_bytes() };
        self.write_raw(&buf)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), IoError>
    {
        self.write_u32(value as u32)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), IoError>
    {
        let buf = if self.is_little_endian { value.to_le_bytes() } else { value.to_be_bytes() };
        self.write_raw(&buf)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), IoError>
    {
        self.write_u64(value as u64)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), IoError>
    {
        self.write_u32(value.to_bits())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), IoError>
    {
        self.write_u64(value.to_bits())
    }

    pub fn write_null_terminated(&mut self, bytes: &[u8]) -> Result<(), IoError>
    {
        self.write_raw(bytes)?;
        self.write_u8(0)
    }
}
