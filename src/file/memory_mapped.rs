//!
//! An on-disk file with a non-zero base address that participates in
//! cross-file pointer resolution through the context's memory map.
//!
use crate::endian::Endianness;
use crate::error::SerializeError;
use crate::file_manager::FileManager;
use crate::io::Stream;

use super::BinaryFile;
use super::FileCore;
use super::FileId;
use super::OpenMode;

pub struct MemoryMappedFile
{
    core: FileCore,
    path: String,
    priority: i32,
    backup_path: Option<String>,
    backed_up: bool,
}

impl MemoryMappedFile
{
    pub fn new(
        id: FileId,
        key: impl Into<String>,
        path: impl Into<String>,
        base_address: u64,
        length: u64,
        priority: i32,
        endianness: Endianness,
    ) -> Self
    {
        assert_ne!(base_address, 0, "a memory-mapped file must have a non-zero base address");
        Self {
            core: FileCore::new(id, key.into(), endianness, base_address, length),
            path: path.into(),
            priority,
            backup_path: None,
            backed_up: false,
        }
    }

    pub fn with_backup(mut self, backup_path: impl Into<String>) -> Self
    {
        self.backup_path = Some(backup_path.into());
        self
    }
}

impl BinaryFile for MemoryMappedFile
{
    fn core(&self) -> &FileCore
    {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FileCore
    {
        &mut self.core
    }

    fn is_memory_mapped(&self) -> bool
    {
        true
    }

    fn memory_mapped_priority(&self) -> i32
    {
        self.priority
    }

    fn open_stream(&mut self, manager: &dyn FileManager, mode: OpenMode) -> Result<Box<dyn Stream>, SerializeError>
    {
        match mode {
            OpenMode::Read => Ok(manager.get_read_stream(&self.path)?),
            OpenMode::Write => {
                if let (Some(backup), false) = (&self.backup_path, self.backed_up) {
                    manager.backup_file(&self.path, backup)?;
                    self.backed_up = true;
                }
                Ok(manager.get_write_stream(&self.path, false)?)
            }
        }
    }
}
