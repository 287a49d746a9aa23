//!
//! Byte-level primitives shared by every [`crate::file::BinaryFile`] variant.
//!
mod reader;
mod shared_buffer;
mod writer;

pub use reader::Reader;
pub use shared_buffer::SharedBuffer;
pub use writer::Writer;

use std::io::Read;
use std::io::Seek;
use std::io::Write;

/// Backing store a [`Reader`]/[`Writer`] operates over. Any seekable stream
/// qualifies — an on-disk file, an in-memory cursor over a decoded block, or
/// a scratch buffer created for a `doEncoded` scope.
///
/// This crate is single-threaded: one serializer drives one cursor over one
/// context, synchronously, so streams are not required to be `Send`.
pub trait Stream: Read + Write + Seek {}
impl<T: Read + Write + Seek> Stream for T {}
