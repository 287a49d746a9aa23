//!
//! An in-memory file, typically created transiently inside a `doEncoded` scope.
//!
use std::cell::RefCell;
use std::rc::Rc;

use crate::endian::Endianness;
use crate::error::SerializeError;
use crate::file_manager::FileManager;
use crate::io::SharedBuffer;
use crate::io::Stream;

use super::BinaryFile;
use super::FileCore;
use super::FileId;
use super::OpenMode;

/// A file backed entirely by an in-memory buffer. Created for encoded-block
/// scopes (and scratch buffers in general). If `allow_local_pointers` is set,
/// pointers parsed while this file is current are treated as offsets local to
/// it rather than being routed through the context's memory map.
pub struct StreamFile
{
    core: FileCore,
    data: Rc<RefCell<Vec<u8>>>,
    allow_local_pointers: bool,
}

impl StreamFile
{
    pub fn new(id: FileId, key: impl Into<String>, buffer: Vec<u8>, endianness: Endianness, allow_local_pointers: bool) -> Self
    {
        let length = buffer.len() as u64;
        Self {
            core: FileCore::new(id, key.into(), endianness, 0, length),
            data: Rc::new(RefCell::new(buffer)),
            allow_local_pointers,
        }
    }

    /// Returns a clone of the current buffer contents. Used when a `doEncoded`
    /// write-scope closes and the scratch buffer must be re-encoded and
    /// spliced back into the outer stream.
    pub fn snapshot(&self) -> Vec<u8>
    {
        self.data.borrow().clone()
    }
}

impl BinaryFile for StreamFile
{
    fn core(&self) -> &FileCore
    {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FileCore
    {
        &mut self.core
    }

    fn allow_local_pointers(&self) -> bool
    {
        self.allow_local_pointers
    }

    fn is_stream(&self) -> bool
    {
        true
    }

    fn snapshot_bytes(&self) -> Option<Vec<u8>>
    {
        Some(self.snapshot())
    }

    fn open_stream(&mut self, _manager: &dyn FileManager, _mode: OpenMode) -> Result<Box<dyn Stream>, SerializeError>
    {
        self.core.length = self.data.borrow().len().max(self.core.length as usize) as u64;
        Ok(Box::new(SharedBuffer::new(self.data.clone())))
    }
}
