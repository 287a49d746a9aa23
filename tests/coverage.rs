use binserde_core::deserialize;
use binserde_core::serialize;
use binserde_core::BinaryFile;
use binserde_core::Context;
use binserde_core::Endianness;
use binserde_core::IdentityEncoder;
use binserde_core::InMemoryFileManager;
use binserde_core::PhysicalLinearFile;
use binserde_core::Pointer;
use binserde_core::Serializable;
use binserde_core::SerializeError;
use binserde_core::SerializerObject;

fn context_with(bytes: Vec<u8>, endianness: Endianness) -> (Context, Pointer)
{
    let length = bytes.len() as u64;
    let manager = InMemoryFileManager::new().with_file("data.bin", bytes);
    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "data.bin", "data.bin", length, endianness);
    let id = ctx.add_file("data.bin", Box::new(file)).unwrap();
    (ctx, Pointer::new(0, id))
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
fn read_coverage_reflects_only_the_bytes_a_struct_actually_consumed()
{
    let (mut ctx, start) = context_with(vec![0u8; 16], Endianness::Little);
    let id = start.file;

    deserialize::<Pair>(&mut ctx, start).expect("read should succeed");

    let read_map = ctx.file(id).unwrap().core().read_map().expect("reads populate the coverage map");
    assert_eq!(read_map.covered_count(), 8, "only the two u32 fields (8 bytes) were read, not the trailing padding");
    assert_eq!(&read_map.to_image()[..8], &[0xFF; 8][..]);
    assert_eq!(&read_map.to_image()[8..], &[0x00; 8][..]);
}

#[derive(Default)]
struct EndianProbe
{
    big: u32,
    little: u32,
    size: u64,
}

impl Serializable for EndianProbe
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        let big = self.big;
        self.big = ser.do_endian(Endianness::Big, |s| s.serialize(big, Some("big")))?;
        self.little = ser.serialize(self.little, Some("little"))?;
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
fn endian_scope_restores_the_outer_endianness_once_the_body_returns()
{
    // big field (4 bytes, big-endian) = 0x01020304, little field (4 bytes,
    // little-endian, file default) = 0x05060708.
    let bytes = vec![0x01, 0x02, 0x03, 0x04, 0x08, 0x07, 0x06, 0x05];
    let (mut ctx, start) = context_with(bytes, Endianness::Little);

    let probe = deserialize::<EndianProbe>(&mut ctx, start).expect("read should succeed");
    assert_eq!(probe.borrow().big, 0x0102_0304, "the do_endian scope must apply big-endian for its own field");
    assert_eq!(probe.borrow().little, 0x0506_0708, "the next field must read back in the file's own little-endian order");
}

#[derive(Default)]
struct Bag
{
    items: Vec<u32>,
    size: u64,
}

impl Serializable for Bag
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        let len = ser.serialize_array_size::<u32>(self.items.len(), Some("len"))?;
        self.items = ser.serialize_array::<u32>(std::mem::take(&mut self.items), len, Some("items"))?;
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
fn array_size_prefix_round_trips_a_variable_length_array()
{
    let manager = InMemoryFileManager::new().with_file("bag.bin", Vec::new());
    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "bag.bin", "bag.bin", 64, Endianness::Little);
    let id = ctx.add_file("bag.bin", Box::new(file)).unwrap();
    let start = Pointer::new(0, id);

    let original = std::rc::Rc::new(std::cell::RefCell::new(Bag { items: vec![10, 20, 30], size: 0 }));
    serialize(&mut ctx, start.clone(), original.clone()).expect("write should succeed");
    ctx.end_write(id).unwrap();

    let roundtripped = deserialize::<Bag>(&mut ctx, start).expect("read should succeed");
    assert_eq!(roundtripped.borrow().items, vec![10, 20, 30]);
}

#[derive(Default)]
struct PartialEncoded
{
    first: u32,
    size: u64,
}

impl Serializable for PartialEncoded
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        let first = self.first;
        self.first = ser.do_encoded(Box::new(IdentityEncoder), None, false, |s| s.serialize(first, Some("first")))?;
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
fn encoded_block_under_consumption_warns_but_does_not_fail_the_read()
{
    // Ten bytes total; the body only reads the first four (`first`), leaving
    // six bytes of the decoded block unconsumed.
    let mut bytes = vec![0u8; 10];
    bytes[0..4].copy_from_slice(&0x2A_u32.to_le_bytes());
    let (mut ctx, start) = context_with(bytes, Endianness::Little);

    let value = deserialize::<PartialEncoded>(&mut ctx, start).expect("under-consumption is a warning, not an error");
    assert_eq!(value.borrow().first, 0x2A);
}

#[derive(Default)]
struct EncodedPair
{
    a: u32,
    b: u32,
    size: u64,
}

impl Serializable for EncodedPair
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        let (a, b) = (self.a, self.b);
        let (a, b) = ser.do_encoded(Box::new(IdentityEncoder), None, false, |s| {
            let a = s.serialize(a, Some("a"))?;
            let b = s.serialize(b, Some("b"))?;
            Ok((a, b))
        })?;
        self.a = a;
        self.b = b;
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
fn encoded_block_write_then_read_round_trips_through_the_snapshot_and_splice()
{
    let manager = InMemoryFileManager::new().with_file("encoded.bin", Vec::new());
    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "encoded.bin", "encoded.bin", 64, Endianness::Little);
    let id = ctx.add_file("encoded.bin", Box::new(file)).unwrap();
    let start = Pointer::new(0, id);

    let original = std::rc::Rc::new(std::cell::RefCell::new(EncodedPair { a: 0x1111_2222, b: 0x3333_4444, size: 0 }));
    serialize(&mut ctx, start.clone(), original).expect("the write-side snapshot/encode/splice path should succeed");
    ctx.end_write(id).unwrap();

    let expected: Vec<u8> = 0x1111_2222_u32.to_le_bytes().into_iter().chain(0x3333_4444_u32.to_le_bytes()).collect();
    let manager = ctx.manager();
    // Re-resolve through the same in-memory manager to check exactly what the
    // splice wrote at the outer position, with the identity encoder in play.
    let written = {
        use std::io::Read;
        let mut stream = manager.get_read_stream("encoded.bin").unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        buf
    };
    assert_eq!(&written[..8], &expected[..]);

    let roundtripped = deserialize::<EncodedPair>(&mut ctx, start).expect("read back through the decoded scratch file should succeed");
    assert_eq!(roundtripped.borrow().a, 0x1111_2222);
    assert_eq!(roundtripped.borrow().b, 0x3333_4444);
}
