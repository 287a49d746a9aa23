//!
//! File identity, backing-stream lifecycle, address-range membership and
//! pointer resolution — the BinaryFile family.
//!
mod memory_mapped;
mod physical_encoded;
mod physical_linear;
mod stream;

pub use memory_mapped::MemoryMappedFile;
pub use physical_encoded::PhysicalEncodedFile;
pub use physical_linear::PhysicalLinearFile;
pub use stream::StreamFile;

use std::collections::BTreeMap;

use crate::coverage::FileReadMap;
use crate::encoder::Encoder;
use crate::endian::Endianness;
use crate::error::IoError;
use crate::error::SerializeError;
use crate::file_manager::FileManager;
use crate::io::Reader;
use crate::io::Writer;
use crate::pointer::Pointer;

/// Stable handle identifying a registered file. Pointers carry this instead
/// of a live reference so they remain plain value types — files are owned by
/// the [`crate::context::Context`], pointers only reference them by handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) u32);

/// Width of a serialized pointer value, auto-derived from
/// `base_address + length` unless a file overrides it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSize
{
    Bits32,
    Bits64,
}

impl PointerSize
{
    pub fn byte_width(self) -> usize
    {
        match self {
            PointerSize::Bits32 => 4,
            PointerSize::Bits64 => 8,
        }
    }

    pub fn derive(base_address: u64, length: u64) -> PointerSize
    {
        if base_address.saturating_add(length) > u32::MAX as u64 {
            PointerSize::Bits64
        } else {
            PointerSize::Bits32
        }
    }
}

/// A named address interval, binary-searchable by start address.
#[derive(Debug, Clone)]
pub struct Region
{
    pub name: String,
    pub start: u64,
    pub end: u64,
}

/// Lifecycle of a file's backing reader/writer: `Unopened -> Reading|Writing ->
/// Closed`. The transition into `Reading`/`Writing` happens lazily on first
/// field access; `Closed` happens on `disposeFile` or context dispose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState
{
    Unopened,
    Reading,
    Writing,
    Closed,
}

/// Shared bookkeeping every [`BinaryFile`] variant embeds: identity, address
/// range, lazily-created reader/writer, coverage map, region/label/override
/// tables.
pub struct FileCore
{
    pub id: FileId,
    pub key: String,
    pub endianness: Endianness,
    pub base_address: u64,
    pub length: u64,
    pub pointer_size: PointerSize,
    pub ignore_cache_on_read: bool,
    pub save_pointers_to_memory_map: bool,
    pub regions: Vec<Region>,
    pub labels: BTreeMap<u64, String>,
    pub override_pointers: BTreeMap<u64, Pointer>,
    pub state: AccessState,
    pub(crate) reader: Option<Reader>,
    pub(crate) writer: Option<Writer>,
    pub(crate) read_map: Option<FileReadMap>,
}

impl FileCore
{
    pub fn new(id: FileId, key: String, endianness: Endianness, base_address: u64, length: u64) -> Self
    {
        Self {
            id,
            key,
            endianness,
            base_address,
            length,
            pointer_size: PointerSize::derive(base_address, length),
            ignore_cache_on_read: false,
            save_pointers_to_memory_map: false,
            regions: Vec::new(),
            labels: BTreeMap::new(),
            override_pointers: BTreeMap::new(),
            state: AccessState::Unopened,
            reader: None,
            writer: None,
            read_map: None,
        }
    }

    pub fn contains_absolute(&self, absolute: u64) -> bool
    {
        absolute >= self.base_address && absolute < self.base_address + self.length
    }

    pub fn region_at(&self, absolute_offset: u64) -> Option<&Region>
    {
        // Regions are kept sorted by `start`; binary search for the last one
        // whose start is <= the query, then check it actually contains it.
        let idx = self.regions.partition_point(|r| r.start <= absolute_offset);
        if idx == 0 {
            return None;
        }
        let candidate = &self.regions[idx - 1];
        if absolute_offset < candidate.end {
            Some(candidate)
        } else {
            None
        }
    }

    pub fn add_override_pointer(&mut self, offset: u64, replacement: Pointer)
    {
        self.override_pointers.insert(offset, replacement);
    }

    pub fn ensure_read_map(&mut self)
    {
        if self.read_map.is_none() {
            self.read_map = Some(FileReadMap::new(self.length as usize));
        }
    }

    pub fn mark_read(&mut self, file_offset: u64, count: u64)
    {
        self.ensure_read_map();
        if let Some(map) = self.read_map.as_mut() {
            map.mark_read(file_offset, count);
        }
    }

    pub fn read_map(&self) -> Option<&FileReadMap>
    {
        self.read_map.as_ref()
    }
}

/// Mode a reader/writer is opened for, passed down to [`BinaryFile::open_stream`]
/// so each variant can pick the right [`FileManager`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode
{
    Read,
    Write,
}

/// Shared contract implemented by every concrete file variant
/// ([`PhysicalLinearFile`], [`PhysicalEncodedFile`], [`MemoryMappedFile`],
/// [`StreamFile`]).
pub trait BinaryFile
{
    fn core(&self) -> &FileCore;
    fn core_mut(&mut self) -> &mut FileCore;

    fn is_memory_mapped(&self) -> bool
    {
        false
    }

    /// Whether this file is a transient, in-memory [`StreamFile`]. Only
    /// streams ever consult `allow_local_pointers`; other non-memory-mapped
    /// variants always range-check against themselves only.
    fn is_stream(&self) -> bool
    {
        false
    }

    fn memory_mapped_priority(&self) -> i32
    {
        0
    }

    /// Whether a pointer local to this file should skip memory-map routing
    /// (only meaningful for [`StreamFile`]s created with `allow_local_pointers`).
    fn allow_local_pointers(&self) -> bool
    {
        false
    }

    /// A copy of this file's current in-memory bytes, if it's backed by one
    /// (only [`StreamFile`] is). Used by `doEncoded` write scopes to recover
    /// what was written into the scratch file before re-encoding it.
    fn snapshot_bytes(&self) -> Option<Vec<u8>>
    {
        None
    }

    /// Opens (or returns the existing) backing stream for `mode`. Physical
    /// variants go through the [`FileManager`]; stream files already own an
    /// in-memory buffer.
    fn open_stream(&mut self, manager: &dyn FileManager, mode: OpenMode) -> Result<Box<dyn crate::io::Stream>, SerializeError>;

    fn create_reader(&mut self, manager: &dyn FileManager) -> Result<&mut Reader, SerializeError>
    {
        if self.core().reader.is_none() {
            let endianness = self.core().endianness;
            let stream = self.open_stream(manager, OpenMode::Read)?;
            self.core_mut().reader = Some(Reader::new(stream, endianness.is_little()));
            self.core_mut().state = AccessState::Reading;
            self.core_mut().ensure_read_map();
        }
        Ok(self.core_mut().reader.as_mut().unwrap())
    }

    fn create_writer(&mut self, manager: &dyn FileManager) -> Result<&mut Writer, SerializeError>
    {
        if self.core().writer.is_none() {
            let endianness = self.core().endianness;
            let stream = self.open_stream(manager, OpenMode::Write)?;
            self.core_mut().writer = Some(Writer::new(stream, endianness.is_little()));
            self.core_mut().state = AccessState::Writing;
        }
        Ok(self.core_mut().writer.as_mut().unwrap())
    }

    fn end_read(&mut self) -> Result<(), SerializeError>
    {
        self.core_mut().reader = None;
        if self.core().state == AccessState::Reading {
            self.core_mut().state = AccessState::Closed;
        }
        Ok(())
    }

    /// Commits the writer: flush, dispose. Variants whose on-disk image
    /// differs from what was written through the writer (encoded files)
    /// override this to re-encode and stream the result out through
    /// `manager` before closing.
    fn end_write(&mut self, _manager: &dyn FileManager) -> Result<(), SerializeError>
    {
        if let Some(writer) = self.core_mut().writer.as_mut() {
            writer.flush().map_err(IoError::Io)?;
        }
        self.core_mut().writer = None;
        if self.core().state == AccessState::Writing {
            self.core_mut().state = AccessState::Closed;
        }
        Ok(())
    }

    /// Whether an unresolved, non-zero pointer `value` (relative to `anchor`)
    /// should be tolerated instead of raising `InvalidPointer`. The default
    /// policy tolerates nothing; variants or callers needing whitelisted
    /// ranges should override this.
    fn allow_invalid_pointer(&self, _value: u64, _anchor: Option<&Pointer>) -> bool
    {
        false
    }
}

/// Starting pointer of a file: equal to its base address, file offset zero.
pub fn start_pointer(file: &dyn BinaryFile) -> Pointer
{
    Pointer::new(file.core().base_address, file.core().id)
}
