//!
//! The primitive type set `serialize<T>` accepts, plus the handful of
//! wrapper newtypes Rust has no built-in type for (24-bit integers, the
//! nullable-byte sentinel).
//!
use crate::error::IoError;
use crate::io::Reader;
use crate::io::Writer;

/// A 24-bit unsigned integer, stored widened to `u32` (top byte always zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U24(pub u32);

/// A 24-bit signed integer, stored widened and sign-extended to `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct I24(pub i32);

/// A single byte where `0xFF` means "no value" and everything else is `Some(byte)`.
/// Writing `Some(0xFF)` is a contract violation of the underlying format and
/// is rejected the same way the source format reserves that sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NullableByte(pub Option<u8>);

/// Every type `serialize::<T>()` can move between the wire and a Rust value:
/// booleans, signed and unsigned 8/16/24/32/64-bit integers, `f32`/`f64`, and
/// the null-terminated-string / nullable-byte special cases.
pub trait Primitive: Sized + Clone + Default + 'static
{
    fn type_name() -> &'static str;
    fn read(reader: &mut Reader) -> Result<Self, IoError>;
    fn write(writer: &mut Writer, value: &Self) -> Result<(), IoError>;
}

macro_rules! impl_primitive_int {
    ($ty:ty, $read:ident, $write:ident) => {
        impl Primitive for $ty
        {
            fn type_name() -> &'static str
            {
                stringify!($ty)
            }
            fn read(reader: &mut Reader) -> Result<Self, IoError>
            {
                reader.$read()
            }
            fn write(writer: &mut Writer, value: &Self) -> Result<(), IoError>
            {
                writer.$write(*value)
            }
        }
    };
}

impl_primitive_int!(i8, read_i8, write_i8);
impl_primitive_int!(u8, read_u8, write_u8);
impl_primitive_int!(i16, read_i16, write_i16);
impl_primitive_int!(u16, read_u16, write_u16);
impl_primitive_int!(i32, read_i32, write_i32);
impl_primitive_int!(u32, read_u32, write_u32);
impl_primitive_int!(i64, read_i64, write_i64);
impl_primitive_int!(u64, read_u64, write_u64);
impl_primitive_int!(f32, read_f32, write_f32);
impl_primitive_int!(f64, read_f64, write_f64);

impl Primitive for bool
{
    fn type_name() -> &'static str
    {
        "bool"
    }

    /// Any byte other than `0`/`1` is malformed but still decodes as `b != 0`;
    /// the caller is responsible for emitting a warning when the raw byte was
    /// out of range.
    fn read(reader: &mut Reader) -> Result<Self, IoError>
    {
        Ok(reader.read_bool()?.0)
    }

    fn write(writer: &mut Writer, value: &Self) -> Result<(), IoError>
    {
        writer.write_bool(*value)
    }
}

impl Primitive for U24
{
    fn type_name() -> &'static str
    {
        "u24"
    }

    fn read(reader: &mut Reader) -> Result<Self, IoError>
    {
        Ok(U24(reader.read_u24()?))
    }

    fn write(writer: &mut Writer, value: &Self) -> Result<(), IoError>
    {
        writer.write_u24(value.0)
    }
}

impl Primitive for I24
{
    fn type_name() -> &'static str
    {
        "i24"
    }

    fn read(reader: &mut Reader) -> Result<Self, IoError>
    {
        Ok(I24(reader.read_i24()?))
    }

    fn write(writer: &mut Writer, value: &Self) -> Result<(), IoError>
    {
        writer.write_i24(value.0)
    }
}

impl Primitive for NullableByte
{
    fn type_name() -> &'static str
    {
        "nullable_byte"
    }

    fn read(reader: &mut Reader) -> Result<Self, IoError>
    {
        let byte = reader.read_u8()?;
        Ok(NullableByte(if byte == 0xFF { None } else { Some(byte) }))
    }

    fn write(writer: &mut Writer, value: &Self) -> Result<(), IoError>
    {
        writer.write_u8(value.0.unwrap_or(0xFF))
    }
}

/// A null-terminated string, encoded/decoded using the active context's
/// default text encoding. Part of the `serialize<T>` primitive set; for
/// fixed-length strings or an explicit encoding, use
/// [`crate::serializer::SerializerObject::serialize_string`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullTerminatedString(pub String);

impl Primitive for NullTerminatedString
{
    fn type_name() -> &'static str
    {
        "string"
    }

    fn read(reader: &mut Reader) -> Result<Self, IoError>
    {
        let bytes = reader.read_until_null()?;
        Ok(NullTerminatedString(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn write(writer: &mut Writer, value: &Self) -> Result<(), IoError>
    {
        writer.write_null_terminated(value.0.as_bytes())
    }
}
