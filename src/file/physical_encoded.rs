//!
//! An on-disk file whose contents are decoded through an [`Encoder`] before
//! being exposed to the serializer, and re-encoded on commit.
//!
use std::cell::RefCell;
use std::io::Read as _;
use std::rc::Rc;

use crate::encoder::Encoder;
use crate::endian::Endianness;
use crate::error::IoError;
use crate::error::SerializeError;
use crate::file_manager::FileManager;
use crate::io::SharedBuffer;
use crate::io::Stream;

use super::AccessState;
use super::BinaryFile;
use super::FileCore;
use super::FileId;
use super::OpenMode;

/// An on-disk file whose real length is only known after decoding. Reads
/// decode the whole file into memory up front; writes buffer into memory and
/// re-encode the whole image on [`BinaryFile::end_write`].
pub struct PhysicalEncodedFile
{
    core: FileCore,
    path: String,
    encoder: Box<dyn Encoder>,
    write_buffer: Option<Rc<RefCell<Vec<u8>>>>,
}

impl PhysicalEncodedFile
{
    pub fn new(id: FileId, key: impl Into<String>, path: impl Into<String>, encoder: Box<dyn Encoder>, endianness: Endianness) -> Self
    {
        Self {
            core: FileCore::new(id, key.into(), endianness, 0, 0),
            path: path.into(),
            encoder,
            write_buffer: None,
        }
    }
}

impl BinaryFile for PhysicalEncodedFile
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
            OpenMode::Read => {
                let mut raw_stream = manager.get_read_stream(&self.path)?;
                let mut raw = Vec::new();
                raw_stream.read_to_end(&mut raw).map_err(IoError::Io)?;

                let decoded = self.encoder.decode(&raw)?;
                self.core.length = decoded.len() as u64;

                Ok(Box::new(std::io::Cursor::new(decoded)))
            }
            OpenMode::Write => {
                let buffer = Rc::new(RefCell::new(Vec::new()));
                self.write_buffer = Some(buffer.clone());
                Ok(Box::new(SharedBuffer::new(buffer)))
            }
        }
    }

    fn end_write(&mut self, manager: &dyn FileManager) -> Result<(), SerializeError>
    {
        if let Some(writer) = self.core.writer.as_mut() {
            writer.flush().map_err(IoError::Io)?;
        }
        self.core.writer = None;

        if let Some(buffer) = self.write_buffer.take() {
            let plain = buffer.borrow().clone();
            self.core.length = plain.len() as u64;

            let encoded = self.encoder.encode(&plain)?;

            let mut out = manager.get_write_stream(&self.path, true).map_err(IoError::Io)?;
            std::io::Write::write_all(&mut out, &encoded).map_err(IoError::Io)?;
            out.flush().map_err(IoError::Io)?;
        }

        if self.core.state == AccessState::Writing {
            self.core.state = AccessState::Closed;
        }
        Ok(())
    }
}
