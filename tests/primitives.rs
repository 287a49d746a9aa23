use std::cell::RefCell;
use std::rc::Rc;

use binserde_core::deserialize;
use binserde_core::serialize;
use binserde_core::Context;
use binserde_core::Endianness;
use binserde_core::InMemoryFileManager;
use binserde_core::NullableByte;
use binserde_core::PhysicalLinearFile;
use binserde_core::Pointer;
use binserde_core::Serializable;
use binserde_core::SerializeError;
use binserde_core::SerializerObject;
use binserde_core::I24;
use binserde_core::U24;

fn context_with(bytes: Vec<u8>) -> (Context, Pointer)
{
    let length = bytes.len() as u64;
    let manager = InMemoryFileManager::new().with_file("data.bin", bytes);
    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "data.bin", "data.bin", length, Endianness::Little);
    let id = ctx.add_file("data.bin", Box::new(file)).unwrap();
    (ctx, Pointer::new(0, id))
}

fn fresh_context(length: u64) -> (Context, Pointer)
{
    let manager = InMemoryFileManager::new().with_file("data.bin", vec![0u8; length as usize]);
    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "data.bin", "data.bin", length, Endianness::Little);
    let id = ctx.add_file("data.bin", Box::new(file)).unwrap();
    (ctx, Pointer::new(0, id))
}

#[derive(Default)]
struct Triple
{
    unsigned: U24,
    signed: I24,
    nullable: NullableByte,
    size: u64,
}

impl Serializable for Triple
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        self.unsigned = ser.serialize(self.unsigned, Some("unsigned"))?;
        self.signed = ser.serialize(self.signed, Some("signed"))?;
        self.nullable = ser.serialize(self.nullable, Some("nullable"))?;
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
fn u24_round_trips_widened_to_u32_and_truncates_the_stored_top_byte()
{
    let (mut ctx, start) = fresh_context(7);
    let original = Rc::new(RefCell::new(Triple { unsigned: U24(0x00FF_FFFF), signed: I24(0), nullable: NullableByte(None), size: 0 }));
    serialize(&mut ctx, start.clone(), original).unwrap();
    ctx.end_write(start.file).unwrap();

    let roundtripped = deserialize::<Triple>(&mut ctx, start).unwrap();
    assert_eq!(roundtripped.borrow().unsigned, U24(0x00FF_FFFF));
}

#[test]
fn i24_round_trips_a_negative_value_sign_extended_to_i32()
{
    let (mut ctx, start) = fresh_context(7);
    let original = Rc::new(RefCell::new(Triple { unsigned: U24(0), signed: I24(-1), nullable: NullableByte(None), size: 0 }));
    serialize(&mut ctx, start.clone(), original).unwrap();
    ctx.end_write(start.file).unwrap();

    let roundtripped = deserialize::<Triple>(&mut ctx, start).unwrap();
    assert_eq!(roundtripped.borrow().signed, I24(-1));
}

#[test]
fn nullable_byte_round_trips_both_some_and_none()
{
    let (mut ctx, start) = fresh_context(7);
    let original = Rc::new(RefCell::new(Triple { unsigned: U24(0), signed: I24(0), nullable: NullableByte(Some(0x42)), size: 0 }));
    serialize(&mut ctx, start.clone(), original).unwrap();
    ctx.end_write(start.file).unwrap();

    let roundtripped = deserialize::<Triple>(&mut ctx, start.clone()).unwrap();
    assert_eq!(roundtripped.borrow().nullable, NullableByte(Some(0x42)));

    let original = Rc::new(RefCell::new(Triple { unsigned: U24(0), signed: I24(0), nullable: NullableByte(None), size: 0 }));
    serialize(&mut ctx, start.clone(), original).unwrap();
    ctx.end_write(start.file).unwrap();

    let roundtripped = deserialize::<Triple>(&mut ctx, start).unwrap();
    assert_eq!(roundtripped.borrow().nullable, NullableByte(None));
}

#[derive(Default)]
struct ChecksummedValue
{
    payload: u32,
    checksum: u32,
    size: u64,
}

impl Serializable for ChecksummedValue
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        self.payload = ser.serialize(self.payload, Some("payload"))?;
        self.checksum = ser.serialize_checksum(self.payload, Some("checksum"))?;
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
fn serialize_checksum_returns_the_stored_value_on_mismatch_instead_of_erroring()
{
    // payload 0x2A, stored checksum 0x2B: the checksum field disagrees with
    // the field it's meant to guard, which must warn rather than fail the read.
    let mut bytes = vec![0u8; 8];
    bytes[0..4].copy_from_slice(&0x2A_u32.to_le_bytes());
    bytes[4..8].copy_from_slice(&0x2B_u32.to_le_bytes());
    let (mut ctx, start) = context_with(bytes);

    let value = deserialize::<ChecksummedValue>(&mut ctx, start).expect("a checksum mismatch is a warning, not an error");
    assert_eq!(value.borrow().payload, 0x2A);
    assert_eq!(value.borrow().checksum, 0x2B, "the actually-stored checksum is still returned, not the expected one");
}

#[test]
fn serialize_checksum_agrees_silently_when_the_stored_value_matches()
{
    let mut bytes = vec![0u8; 8];
    bytes[0..4].copy_from_slice(&0x2A_u32.to_le_bytes());
    bytes[4..8].copy_from_slice(&0x2A_u32.to_le_bytes());
    let (mut ctx, start) = context_with(bytes);

    let value = deserialize::<ChecksummedValue>(&mut ctx, start).unwrap();
    assert_eq!(value.borrow().checksum, 0x2A);
}
