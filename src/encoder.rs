//!
//! External collaborator contract for reversible stream transforms (compression,
//! obfuscation, container-specific packing). Concrete encoders are out of this
//! crate's scope — callers plug in their own.
//!
use crate::error::SerializeError;

/// Decodes a stored byte block into its logical contents and re-encodes on
/// write. Decoded output must be a complete, independently addressable image
/// — [`PhysicalEncodedFile`](crate::file::PhysicalEncodedFile) and `doEncoded`
/// scopes both decode eagerly rather than streaming.
pub trait Encoder
{
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, SerializeError>;
    fn encode(&self, input: &[u8]) -> Result<Vec<u8>, SerializeError>;
}

/// An encoder that performs no transformation. Useful as a default and in
/// tests that exercise the `doEncoded` scope machinery without caring about
/// the transform itself.
pub struct IdentityEncoder;

impl Encoder for IdentityEncoder
{
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, SerializeError>
    {
        Ok(input.to_vec())
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>, SerializeError>
    {
        Ok(input.to_vec())
    }
}
