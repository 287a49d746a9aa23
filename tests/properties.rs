use std::cell::RefCell;
use std::rc::Rc;

use binserde_core::deserialize;
use binserde_core::serialize;
use binserde_core::BinaryDeserializer;
use binserde_core::BinarySerializer;
use binserde_core::Context;
use binserde_core::Endianness;
use binserde_core::InMemoryFileManager;
use binserde_core::PhysicalLinearFile;
use binserde_core::Pointer;
use binserde_core::RepeatingXor;
use binserde_core::Serializable;
use binserde_core::SerializeError;
use binserde_core::SerializerObject;
use proptest::prelude::*;

fn fresh_context(length: u64, endianness: Endianness) -> (Context, Pointer)
{
    let manager = InMemoryFileManager::new().with_file("data.bin", vec![0u8; length as usize]);
    let mut ctx = Context::new(Box::new(manager));
    let file = PhysicalLinearFile::new(ctx.allocate_file_id(), "data.bin", "data.bin", length, endianness);
    let id = ctx.add_file("data.bin", Box::new(file)).unwrap();
    (ctx, Pointer::new(0, id))
}

#[derive(Default)]
struct Value32
{
    value: u32,
    size: u64,
}

impl Serializable for Value32
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        self.value = ser.serialize(self.value, Some("value"))?;
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

proptest! {
    /// Property 1: round-trip of a primitive holds for any value under any endianness.
    #[test]
    fn primitive_round_trips_under_arbitrary_endianness(value in any::<u32>(), big in any::<bool>())
    {
        let endianness = if big { Endianness::Big } else { Endianness::Little };
        let (mut ctx, start) = fresh_context(4, endianness);

        let original = Rc::new(RefCell::new(Value32 { value, size: 0 }));
        serialize(&mut ctx, start.clone(), original).unwrap();
        ctx.end_write(start.file).unwrap();

        let roundtripped = deserialize::<Value32>(&mut ctx, start).unwrap();
        prop_assert_eq!(roundtripped.borrow().value, value);
    }

    /// Property 1 under an XOR filter (scenario S4's key installed for arbitrary payloads):
    /// writing through `begin_xor`/`end_xor` and reading back through the same key
    /// recovers the original bytes.
    #[test]
    fn primitive_round_trips_under_arbitrary_xor_key(value in any::<u32>(), key in 1u8..=255)
    {
        let (mut ctx, start) = fresh_context(4, Endianness::Little);

        {
            let mut writer = BinarySerializer::new(&mut ctx, start.clone()).unwrap();
            writer.begin_xor(Box::new(RepeatingXor::constant(key)));
            writer.serialize(value, Some("value")).unwrap();
            writer.end_xor();
        }
        ctx.end_write(start.file).unwrap();

        let mut reader = BinaryDeserializer::new(&mut ctx, start).unwrap();
        reader.begin_xor(Box::new(RepeatingXor::constant(key)));
        let read_back = reader.serialize(0u32, Some("value")).unwrap();
        reader.end_xor();

        prop_assert_eq!(read_back, value);
    }
}

#[derive(Default)]
struct XorBytes
{
    values: [u8; 3],
    size: u64,
}

impl Serializable for XorBytes
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        ser.begin_xor(Box::new(RepeatingXor::constant(0x5A)));
        for (i, byte) in self.values.iter_mut().enumerate() {
            *byte = ser.serialize(*byte, Some(&format!("values[{i}]")))?;
        }
        ser.end_xor();
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

/// Scenario S4: an XOR scope with key `0x5A` around `[0, 1, 2]` stores
/// `[0x5A, 0x5B, 0x58]` on disk and decodes back to `[0, 1, 2]` under the
/// same filter.
#[test]
fn xor_scope_with_key_0x5a_stores_scrambled_bytes_and_decodes_back()
{
    let (mut ctx, start) = fresh_context(3, Endianness::Little);

    let original = Rc::new(RefCell::new(XorBytes { values: [0, 1, 2], size: 0 }));
    serialize(&mut ctx, start.clone(), original).unwrap();
    ctx.end_write(start.file).unwrap();

    let raw = {
        use std::io::Read;
        let mut stream = ctx.manager().get_read_stream("data.bin").unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        buf
    };
    assert_eq!(raw, vec![0x5A, 0x5B, 0x58]);

    let roundtripped = deserialize::<XorBytes>(&mut ctx, start).unwrap();
    assert_eq!(roundtripped.borrow().values, [0, 1, 2]);
}

#[derive(Default)]
struct BitFields
{
    narrow: u8,
    mid: u8,
    wide: u8,
    packed: u16,
    size: u64,
}

impl Serializable for BitFields
{
    fn init(&mut self, _pointer: Pointer) {}

    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>
    {
        let mut narrow = self.narrow as u64;
        let mut mid = self.mid as u64;
        let mut wide = self.wide as u64;

        self.packed = ser.serialize_bit_values::<u16>(
            &mut |access| {
                access.bits(3, &mut narrow);
                access.bits(5, &mut mid);
                access.bits(8, &mut wide);
            },
            Some("packed"),
        )?;

        self.narrow = narrow as u8;
        self.mid = mid as u8;
        self.wide = wide as u8;
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

proptest! {
    /// Property 7: a `[3, 5, 8]` width decomposition of a 16-bit container
    /// round-trips each field modulo its own `2^width`, for any input values.
    #[test]
    fn bitfield_duality_holds_for_an_arbitrary_width_decomposition(narrow in any::<u8>(), mid in any::<u8>(), wide in any::<u8>())
    {
        let (mut ctx, start) = fresh_context(2, Endianness::Little);

        let original = Rc::new(RefCell::new(BitFields { narrow, mid, wide, packed: 0, size: 0 }));
        serialize(&mut ctx, start.clone(), original).unwrap();
        ctx.end_write(start.file).unwrap();

        let roundtripped = deserialize::<BitFields>(&mut ctx, start).unwrap();
        let r = roundtripped.borrow();
        prop_assert_eq!(r.narrow, narrow & 0b0000_0111);
        prop_assert_eq!(r.mid, mid & 0b0001_1111);
        prop_assert_eq!(r.wide, wide);
    }
}
