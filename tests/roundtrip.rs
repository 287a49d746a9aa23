use std::cell::RefCell;
use std::rc::Rc;

use binserde_core::deserialize;
use binserde_core::serialize;
use binserde_core::Context;
use binserde_core::Endianness;
use binserde_core::InMemoryFileManager;
use binserde_core::PhysicalLinearFile;
use binserde_core::Pointer;
use binserde_core::Serializable;
use binserde_core::SerializeError;
use binserde_core::SerializerObject;

#[derive(Default, Debug, PartialEq, Clone)]
struct Header
{
    magic: u32,
    version: u16,
    name: String,
    flags: u8,
    size: u64,
}

impl Serializable for Header
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        self.magic = ser.serialize(self.magic, Some("magic"))?;
        self.version = ser.serialize(self.version, Some("version"))?;
        self.name = ser.serialize_string(&self.name, Some(16), None, Some("name"))?;
        self.flags = ser.serialize(self.flags, Some("flags"))?;
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

fn build_context(endianness: Endianness) -> (Context, Pointer)
{
    let manager = InMemoryFileManager::new().with_file("header.bin", Vec::new());
    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "header.bin", "header.bin", 64, endianness);
    let id = ctx.add_file("header.bin", Box::new(file)).unwrap();
    let start = Pointer::new(0, id);
    (ctx, start)
}

#[test]
fn round_trips_a_primitive_struct()
{
    let (mut ctx, start) = build_context(Endianness::Little);

    let original = Rc::new(RefCell::new(Header {
        magic: 0xDEAD_BEEF,
        version: 7,
        name: "test-fixture".to_string(),
        flags: 0b0000_0101,
        size: 0,
    }));

    serialize(&mut ctx, start.clone(), original.clone()).expect("write should succeed");
    ctx.end_write(start.file).expect("flush should succeed");

    let roundtripped = deserialize::<Header>(&mut ctx, start).expect("read should succeed");

    assert_eq!(roundtripped.borrow().magic, original.borrow().magic);
    assert_eq!(roundtripped.borrow().version, original.borrow().version);
    assert_eq!(roundtripped.borrow().name, original.borrow().name);
    assert_eq!(roundtripped.borrow().flags, original.borrow().flags);
}

#[test]
fn big_endian_round_trip_differs_byte_order_but_not_value()
{
    let (mut ctx, start) = build_context(Endianness::Big);

    let original = Rc::new(RefCell::new(Header {
        magic: 0x0102_0304,
        version: 1,
        name: "be".to_string(),
        flags: 0xFF,
        size: 0,
    }));

    serialize(&mut ctx, start.clone(), original.clone()).unwrap();
    ctx.end_write(start.file).unwrap();

    let roundtripped = deserialize::<Header>(&mut ctx, start).unwrap();
    assert_eq!(roundtripped.borrow().magic, 0x0102_0304);
}

#[test]
fn malformed_bool_is_a_warning_not_an_error()
{
    use binserde_core::serializer::BinaryDeserializer;

    let manager = InMemoryFileManager::new().with_file("bools.bin", vec![0x05, 0x00]);
    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "bools.bin", "bools.bin", 2, Endianness::Little);
    let id = ctx.add_file("bools.bin", Box::new(file)).unwrap();

    let mut deserializer = BinaryDeserializer::new(&mut ctx, Pointer::new(0, id)).unwrap();
    let value = deserializer.serialize(false, Some("weird_bool")).unwrap();
    assert!(value, "any nonzero byte reads as true, it just also warns");
}
