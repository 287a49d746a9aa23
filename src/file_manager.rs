//!
//! External collaborator contract for concrete file-system access. Concrete
//! implementations (local disk, virtual ROM directory, archive-backed) are
//! out of this crate's scope.
//!
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Read as _;
use std::rc::Rc;

use crate::io::Reader;
use crate::io::SharedBuffer;
use crate::io::Stream;

/// Capability a [`crate::context::Context`] is configured with to actually
/// touch storage. Every [`crate::file::BinaryFile`] variant routes its stream
/// creation through one of these methods rather than calling `std::fs`
/// directly, so tests can swap in an in-memory implementation.
pub trait FileManager
{
    fn directory_exists(&self, path: &str) -> bool;
    fn file_exists(&self, path: &str) -> bool;
    fn get_read_stream(&self, path: &str) -> std::io::Result<Box<dyn Stream>>;
    fn get_write_stream(&self, path: &str, recreate: bool) -> std::io::Result<Box<dyn Stream>>;

    /// Hint that up to `length` bytes starting at the reader's current
    /// position will likely be read soon. May be a no-op; this crate's
    /// synchronous model treats it as a call that always completes
    /// immediately rather than a suspension point a scheduler waits on.
    fn fill_cache_for_read(&self, _length: u64, _reader: &mut Reader) {}

    /// Copies the file at `path` to `backup_path`. Used by
    /// [`crate::file::PhysicalLinearFile`]'s backup-before-write policy.
    /// Default implementation round-trips through `get_read_stream`/
    /// `get_write_stream` so a minimal [`FileManager`] gets backups for free.
    fn backup_file(&self, path: &str, backup_path: &str) -> std::io::Result<()>
    {
        let mut src = self.get_read_stream(path)?;
        let mut dst = self.get_write_stream(backup_path, true)?;
        let mut buf = Vec::new();
        src.read_to_end(&mut buf)?;
        std::io::Write::write_all(&mut dst, &buf)
    }
}

/// A [`FileManager`] backed by an in-memory map of path to bytes. Used by
/// this crate's own tests and handy as a starting point for host
/// implementations that want to stage files before committing to disk.
#[derive(Default)]
pub struct InMemoryFileManager
{
    files: RefCell<HashMap<String, Rc<RefCell<Vec<u8>>>>>,
}

impl InMemoryFileManager
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<String>, bytes: Vec<u8>) -> Self
    {
        self.files.borrow_mut().insert(path.into(), Rc::new(RefCell::new(bytes)));
        self
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>>
    {
        self.files.borrow().get(path).map(|b| b.borrow().clone())
    }
}

impl FileManager for InMemoryFileManager
{
    fn directory_exists(&self, _path: &str) -> bool
    {
        true
    }

    fn file_exists(&self, path: &str) -> bool
    {
        self.files.borrow().contains_key(path)
    }

    fn get_read_stream(&self, path: &str) -> std::io::Result<Box<dyn Stream>>
    {
        let entry = self.files.borrow().get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no such in-memory file: {path}"))
        })?;
        Ok(Box::new(SharedBuffer::new(entry)))
    }

    fn get_write_stream(&self, path: &str, recreate: bool) -> std::io::Result<Box<dyn Stream>>
    {
        let mut files = self.files.borrow_mut();
        let entry = files
            .entry(path.to_string())
            .or_insert_with(|| Rc::new(RefCell::new(Vec::new())));

        if recreate {
            entry.borrow_mut().clear();
        }

        Ok(Box::new(SharedBuffer::new(entry.clone())))
    }
}
