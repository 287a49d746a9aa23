//!
//! An on-disk file with base address 0, exposed to the serializer unchanged.
//!
use crate::endian::Endianness;
use crate::error::SerializeError;
use crate::file_manager::FileManager;
use crate::io::Stream;

use super::BinaryFile;
use super::FileCore;
use super::FileId;
use super::OpenMode;

/// A plain on-disk file. Not memory-mapped, base address always zero.
pub struct PhysicalLinearFile
{
    core: FileCore,
    path: String,
    /// If set, a copy of the file is made at this path before the first write.
    backup_path: Option<String>,
    backed_up: bool,
}

impl PhysicalLinearFile
{
    pub fn new(id: FileId, key: impl Into<String>, path: impl Into<String>, length: u64, endianness: Endianness) -> Self
    {
        Self {
            core: FileCore::new(id, key.into(), endianness, 0, length),
            path: path.into(),
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

impl BinaryFile for PhysicalLinearFile
{
    fn core(&self) -> &FileCore
    {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FileCore
    {
        &mut self.core
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
