//!
//! Checksum tap, fed every post-XOR byte while installed.
//!
use crc::Crc;
use crc::CRC_32_ISCSI;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// A running checksum over the logical (post-XOR) byte stream.
pub trait ChecksumCalculator
{
    fn process_byte(&mut self, byte: u8);
    fn value(&self) -> u64;
}

/// Reference implementation built on CRC-32/ISCSI, the same polynomial the
/// rest of this crate's corpus reaches for when it needs an off-the-shelf
/// checksum.
#[derive(Debug, Default)]
pub struct Crc32Checksum
{
    digest_bytes: Vec<u8>,
}

impl Crc32Checksum
{
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl ChecksumCalculator for Crc32Checksum
{
    fn process_byte(&mut self, byte: u8)
    {
        self.digest_bytes.push(byte);
    }

    fn value(&self) -> u64
    {
        CRC32.checksum(&self.digest_bytes) as u64
    }
}
