//!
//! Per-byte filters installed on a [`crate::io::Reader`]/[`crate::io::Writer`].
//!
//! Installing a filter is a nested scope: only one XOR filter is active at a
//! time, and nesting replaces-then-restores rather than composing, matching
//! the source's `beginXOR`/`endXOR` pairing.
//!
mod checksum;
mod xor;

pub use checksum::ChecksumCalculator;
pub use checksum::Crc32Checksum;
pub use xor::RepeatingXor;
pub use xor::XorCalculator;
