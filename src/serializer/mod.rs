//!
//! The declarative serialization API: one trait, implemented once for
//! reading ([`deserialize::BinaryDeserializer`]) and once for writing
//! ([`serialize::BinarySerializer`]). A `Serializable` type's body calls
//! these operations in field order; which concrete implementation it's
//! driven by decides whether that body reads or writes.
//!
pub mod bits;
pub mod deserialize;
pub mod primitive;
pub mod serialize;

pub use bits::BitAccess;
pub use deserialize::BinaryDeserializer;
pub use primitive::NullTerminatedString;
pub use primitive::NullableByte;
pub use primitive::Primitive;
pub use primitive::I24;
pub use primitive::U24;
pub use serialize::BinarySerializer;

use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;

use self::bits::BitContainer;
use crate::encoder::Encoder;
use crate::endian::Endianness;
use crate::error::SerializeError;
use crate::file::FileId;
use crate::filters::ChecksumCalculator;
use crate::filters::XorCalculator;
use crate::pointer::Pointer;
use crate::pointer::TypedPointer;
use crate::serializable::Serializable;

/// The one declarative API shared by the read and write directions.
///
/// `serialize` is the generic primitive op, `serialize_object`/
/// `serialize_pointer*` cover object graphs and addressing, the `*_array*`
/// family covers bulk operations, and the `do_*`/`begin_*`/`end_*` family
/// covers the strictly-nested scopes (file/position, endianness, XOR,
/// checksum, encoded blocks).
pub trait SerializerObject: Sized
{
    /// `true` for the deserializer, `false` for the serializer. Lets shared
    /// helper code (logging, the bool/checksum warning paths) branch without
    /// every operation re-deriving it.
    fn is_reading(&self) -> bool;

    /// The pointer at the engine's current cursor: current file + current
    /// stream position.
    fn current_pointer(&mut self) -> Result<Pointer, SerializeError>;

    fn current_file(&self) -> FileId;

    /// One primitive: bool, signed/unsigned 8/16/24/32/64, f32/f64, or a
    /// null-terminated string — see [`Primitive`] for the full type set this
    /// accepts.
    fn serialize<T: Primitive>(&mut self, value: T, name: Option<&str>) -> Result<T, SerializeError>;

    /// Fixed-length (if `length` given) or null-terminated string, using
    /// `encoding` or the context's default.
    fn serialize_string(
        &mut self,
        value: &str,
        length: Option<usize>,
        encoding: Option<&'static Encoding>,
        name: Option<&str>,
    ) -> Result<String, SerializeError>;

    /// Consults the object cache at the current pointer: on a cache hit
    /// (and the file not set to ignore the cache on read), skips
    /// `instance.size` bytes and returns the cached instance; on a miss,
    /// constructs, caches (before running `serialize`, so cycles resolve),
    /// runs `onPreSerialize` then `serialize`, and records `size`.
    fn serialize_object<T: Serializable>(
        &mut self,
        value: Rc<RefCell<T>>,
        on_pre_serialize: Option<&mut dyn FnMut(&mut T)>,
        name: Option<&str>,
    ) -> Result<Rc<RefCell<T>>, SerializeError>;

    /// Raw pointer value (32- or 64-bit, per the active file's
    /// `pointer_size`). Zero is always null. A non-zero value that fails to
    /// resolve raises `InvalidPointer` unless `allow_invalid` or the active
    /// file whitelists it.
    fn serialize_pointer(
        &mut self,
        value: Option<Pointer>,
        anchor: Option<&Pointer>,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Option<Pointer>, SerializeError>;

    /// As [`SerializerObject::serialize_pointer`], plus an optional eager
    /// target serialization at the resolved address (`resolve = true`),
    /// with cursor save/restore around it.
    fn serialize_pointer_object<T: Serializable>(
        &mut self,
        value: Option<TypedPointer<T>>,
        anchor: Option<&Pointer>,
        resolve: bool,
        on_pre_serialize: Option<&mut dyn FnMut(&mut T)>,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Option<TypedPointer<T>>, SerializeError>;

    /// `count` elements via `serialize::<T>`. Implementations must fast-path
    /// `T = u8` as one bulk read/write plus one coverage-map update rather
    /// than looping element-by-element.
    fn serialize_array<T: Primitive>(&mut self, buf: Vec<T>, count: usize, name: Option<&str>) -> Result<Vec<T>, SerializeError>;

    fn serialize_byte_array(&mut self, buf: Vec<u8>, count: usize, name: Option<&str>) -> Result<Vec<u8>, SerializeError>;

    fn serialize_object_array<T: Serializable>(
        &mut self,
        buf: Vec<Rc<RefCell<T>>>,
        count: usize,
        name: Option<&str>,
    ) -> Result<Vec<Rc<RefCell<T>>>, SerializeError>;

    fn serialize_pointer_array(
        &mut self,
        buf: Vec<Option<Pointer>>,
        count: usize,
        anchor: Option<&Pointer>,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Vec<Option<Pointer>>, SerializeError>;

    fn serialize_pointer_object_array<T: Serializable>(
        &mut self,
        buf: Vec<Option<TypedPointer<T>>>,
        count: usize,
        anchor: Option<&Pointer>,
        resolve: bool,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Vec<Option<TypedPointer<T>>>, SerializeError>;

    fn serialize_string_array(
        &mut self,
        buf: Vec<String>,
        count: usize,
        length: Option<usize>,
        encoding: Option<&'static Encoding>,
        name: Option<&str>,
    ) -> Result<Vec<String>, SerializeError>;

    /// Serializes a length prefix of integer type `U`, tied to `buf.len()`:
    /// on read, the prefix resizes `buf` before the caller serializes its
    /// elements; on write, the prefix is simply `buf.len()`.
    fn serialize_array_size<U: Primitive + TryInto<usize> + TryFrom<usize>>(
        &mut self,
        len: usize,
        name: Option<&str>,
    ) -> Result<usize, SerializeError>;

    /// Reads/writes one `T`, decomposing it into LSB-first bitfields via
    /// `body`. See [`BitAccess`] for why read and write share one closure
    /// shape.
    fn serialize_bit_values<T: BitContainer>(&mut self, body: &mut dyn FnMut(&mut dyn BitAccess), name: Option<&str>) -> Result<T, SerializeError>;

    /// Reads/writes one `T`; on read, warns (does not error) if it differs
    /// from `expected`.
    fn serialize_checksum<T: Primitive + PartialEq>(&mut self, expected: T, name: Option<&str>) -> Result<T, SerializeError>;

    /// Switches the current file/position if needed. A null pointer is a no-op.
    fn goto(&mut self, pointer: &Pointer) -> Result<(), SerializeError>;

    /// Saves position and file, `goto`s, runs `body`, restores — even if
    /// `body` errors. A null pointer skips `body` entirely.
    fn do_at<R>(&mut self, pointer: Option<&Pointer>, body: impl FnOnce(&mut Self) -> Result<R, SerializeError>) -> Result<Option<R>, SerializeError>;

    /// Swaps the active endianness around `body`, restoring it afterward
    /// even on error.
    fn do_endian<R>(&mut self, endianness: Endianness, body: impl FnOnce(&mut Self) -> Result<R, SerializeError>) -> Result<R, SerializeError>;

    /// Decodes the remainder of the active stream into a fresh in-memory
    /// [`crate::file::StreamFile`], runs `body` against it, then
    /// deregisters it. Warns (`UnderConsumedEncodedBlock`) if `body` left
    /// bytes unread. On write, `body` writes into the scratch file, which is
    /// re-encoded and spliced back at the outer position when the scope closes.
    fn do_encoded<R>(
        &mut self,
        encoder: Box<dyn Encoder>,
        endianness: Option<Endianness>,
        allow_local_pointers: bool,
        body: impl FnOnce(&mut Self) -> Result<R, SerializeError>,
    ) -> Result<R, SerializeError>;

    fn begin_xor(&mut self, filter: Box<dyn XorCalculator>);
    fn end_xor(&mut self);

    fn begin_calculate_checksum(&mut self, calculator: Box<dyn ChecksumCalculator>);
    fn end_calculate_checksum(&mut self) -> u64;

    /// Emits one log line, when logging is enabled, of the shape
    /// `"(READ|WRITE) {pointer}:  {indent}{message}"`.
    fn log(&mut self, message: &str);
}
