//!
//! Error types for the serialization core.
//!
//! Warnings (checksum mismatches, under-consumed encoded blocks, malformed
//! booleans) are *not* represented here — they are logged through
//! [`crate::context::Context::log`] and never abort a call.
//!
use thiserror::Error as ThisError;

use crate::pointer::Pointer;

/// Errors raised while resolving or serializing pointers.
#[derive(Debug, ThisError)]
pub enum PointerError
{
    #[error("pointer value {value:#x} at {site} does not resolve to any registered file")]
    InvalidPointer { value: u64, site: String },

    #[error("pointer arithmetic or anchor misuse: {reason}")]
    PointerException { reason: String },
}

/// Errors raised by the [`crate::context::Context`] file registry.
#[derive(Debug, ThisError)]
pub enum ContextError
{
    #[error("a file is already registered under the key {key}")]
    DuplicateFile { key: String },

    #[error("no file is registered under the key {key}")]
    UnknownFile { key: String },
}

/// Errors raised by the byte-level reader/writer.
#[derive(Debug, ThisError)]
pub enum IoError
{
    #[error("attempted to read past the end of the stream at position {position}")]
    EndOfInput { position: u64 },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while encoding/decoding text.
#[derive(Debug, ThisError)]
pub enum EncodingError
{
    #[error("could not decode {byte_count} bytes as text using {encoding}")]
    Decode { byte_count: usize, encoding: &'static str },

    #[error("could not encode string of {char_count} chars using {encoding}")]
    Encode { char_count: usize, encoding: &'static str },
}

/// The union of everything a [`crate::serializer::SerializerObject`] operation can fail with.
#[derive(Debug, ThisError)]
pub enum SerializeError
{
    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("operation attempted on a disposed context or file")]
    Disposed,

    #[error("type {type_name} is not a supported primitive for serialize::<T>()")]
    NotSupportedType { type_name: &'static str },
}

impl From<std::io::Error> for SerializeError
{
    fn from(e: std::io::Error) -> Self
    {
        SerializeError::Io(IoError::Io(e))
    }
}

/// Helper used by [`PointerError::InvalidPointer`] call sites to describe where
/// resolution was attempted.
pub(crate) fn pointer_site(p: &Pointer) -> String
{
    format!("{p:?}")
}
