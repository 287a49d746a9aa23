//!
//! A declarative, bidirectional serializer for binary file formats.
//!
//! A [`Serializable`] type writes one `serialize` body, in field order, using
//! the operations on [`SerializerObject`]. Driving that body with a
//! [`BinaryDeserializer`] reads a value out of a file; driving it with a
//! [`BinarySerializer`] writes one back. [`Context`] owns the registered
//! [`file::BinaryFile`]s, the cross-file pointer resolution that lets typed
//! pointers address other registered files, and the object cache that makes
//! cyclic and shared object graphs terminate and stay identity-correct.
//!
//! This crate deliberately stops at the trait boundary for concrete storage
//! ([`FileManager`]) and concrete block transforms ([`Encoder`]) — plug in
//! real filesystem or in-memory implementations, and real compression or
//! obfuscation codecs, as needed by the format being described.
pub mod context;
pub mod coverage;
pub mod encoder;
pub mod endian;
pub mod error;
pub mod file;
pub mod file_manager;
pub mod filters;
pub mod io;
pub mod pointer;
pub mod serializable;
pub mod serializer;

pub use context::Context;
pub use context::ObjectCache;
pub use encoder::Encoder;
pub use encoder::IdentityEncoder;
pub use endian::Endianness;
pub use error::ContextError;
pub use error::EncodingError;
pub use error::IoError;
pub use error::PointerError;
pub use error::SerializeError;
pub use file::BinaryFile;
pub use file::FileCore;
pub use file::FileId;
pub use file::MemoryMappedFile;
pub use file::OpenMode;
pub use file::PhysicalEncodedFile;
pub use file::PhysicalLinearFile;
pub use file::PointerSize;
pub use file::Region;
pub use file::StreamFile;
pub use file_manager::FileManager;
pub use file_manager::InMemoryFileManager;
pub use filters::ChecksumCalculator;
pub use filters::Crc32Checksum;
pub use filters::RepeatingXor;
pub use filters::XorCalculator;
pub use pointer::Pointer;
pub use pointer::TypedPointer;
pub use serializable::Serializable;
pub use serializer::BinaryDeserializer;
pub use serializer::BinarySerializer;
pub use serializer::BitAccess;
pub use serializer::NullTerminatedString;
pub use serializer::NullableByte;
pub use serializer::Primitive;
pub use serializer::SerializerObject;
pub use serializer::I24;
pub use serializer::U24;

use std::cell::RefCell;
use std::rc::Rc;

/// Reads one `T` out of `ctx`, starting at `start`. Convenience wrapper
/// around constructing a [`BinaryDeserializer`] and calling
/// [`SerializerObject::serialize_object`].
pub fn deserialize<T: Serializable>(ctx: &mut Context, start: Pointer) -> Result<Rc<RefCell<T>>, SerializeError>
{
    let mut deserializer = BinaryDeserializer::new(ctx, start)?;
    let placeholder = Rc::new(RefCell::new(T::default()));
    deserializer.serialize_object(placeholder, None, None)
}

/// Writes `value` into `ctx` at `start`. Convenience wrapper around
/// constructing a [`BinarySerializer`] and calling
/// [`SerializerObject::serialize_object`].
pub fn serialize<T: Serializable>(ctx: &mut Context, start: Pointer, value: Rc<RefCell<T>>) -> Result<(), SerializeError>
{
    let mut serializer = BinarySerializer::new(ctx, start)?;
    serializer.serialize_object(value, None, None)?;
    Ok(())
}
