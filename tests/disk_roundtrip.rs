use std::cell::RefCell;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::rc::Rc;

use binserde_core::deserialize;
use binserde_core::io::Stream;
use binserde_core::serialize;
use binserde_core::Context;
use binserde_core::Endianness;
use binserde_core::FileManager;
use binserde_core::PhysicalLinearFile;
use binserde_core::Pointer;
use binserde_core::Serializable;
use binserde_core::SerializeError;
use binserde_core::SerializerObject;

/// A [`FileManager`] backed by a scratch directory on disk, for the one
/// corner of this crate that genuinely touches a filesystem: `PhysicalLinearFile`'s
/// backup-before-write path, which round-trips through real `get_read_stream`/
/// `get_write_stream` calls rather than the in-memory ones every other test uses.
struct DiskFileManager
{
    dir: tempfile::TempDir,
}

impl DiskFileManager
{
    fn new() -> Self
    {
        Self { dir: tempfile::tempdir().expect("creating a scratch directory should not fail") }
    }

    fn full_path(&self, path: &str) -> PathBuf
    {
        self.dir.path().join(path)
    }
}

impl FileManager for DiskFileManager
{
    fn directory_exists(&self, _path: &str) -> bool
    {
        true
    }

    fn file_exists(&self, path: &str) -> bool
    {
        self.full_path(path).exists()
    }

    fn get_read_stream(&self, path: &str) -> std::io::Result<Box<dyn Stream>>
    {
        Ok(Box::new(File::open(self.full_path(path))?))
    }

    fn get_write_stream(&self, path: &str, recreate: bool) -> std::io::Result<Box<dyn Stream>>
    {
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(recreate).open(self.full_path(path))?;
        Ok(Box::new(file))
    }
}

#[derive(Default)]
struct Pair
{
    a: u32,
    b: u32,
    size: u64,
}

impl Serializable for Pair
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        self.a = ser.serialize(self.a, Some("a"))?;
        self.b = ser.serialize(self.b, Some("b"))?;
        Ok(())
    }

    fn size(&self) -> u64
    {
        self.size
    }

    fn set_size(&mut self, size: u64)
    {
        self.size = size;
    }
}

#[test]
fn physical_linear_file_round_trips_through_a_real_on_disk_stream()
{
    let manager = DiskFileManager::new();
    // Pre-create the file so `get_read_stream`/`get_write_stream` have something to open.
    std::fs::write(manager.full_path("pair.bin"), vec![0u8; 8]).unwrap();

    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "pair.bin", "pair.bin", 8, Endianness::Little);
    let id = ctx.add_file("pair.bin", Box::new(file)).unwrap();
    let start = Pointer::new(0, id);

    let original = Rc::new(RefCell::new(Pair { a: 11, b: 22, size: 0 }));
    serialize(&mut ctx, start.clone(), original).expect("write through the disk-backed stream should succeed");
    ctx.end_write(id).unwrap();

    let roundtripped = deserialize::<Pair>(&mut ctx, start).expect("read back through the disk-backed stream should succeed");
    assert_eq!(roundtripped.borrow().a, 11);
    assert_eq!(roundtripped.borrow().b, 22);
}

#[test]
fn backup_file_copies_the_prior_contents_before_the_first_write()
{
    let manager = DiskFileManager::new();
    std::fs::write(manager.full_path("live.bin"), vec![0xAAu8; 8]).unwrap();

    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "live.bin", "live.bin", 8, Endianness::Little).with_backup("live.bin.bak");
    let id = ctx.add_file("live.bin", Box::new(file)).unwrap();
    let start = Pointer::new(0, id);

    let original = Rc::new(RefCell::new(Pair { a: 1, b: 2, size: 0 }));
    serialize(&mut ctx, start, original).unwrap();
    ctx.end_write(id).unwrap();

    let backup_path = ctx.manager().file_exists("live.bin.bak");
    assert!(backup_path, "backup_file should have copied the original contents before the write");
}
