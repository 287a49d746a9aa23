//!
//! Contract a user-defined type implements to become (de)serializable.
//!
use crate::error::SerializeError;
use crate::pointer::Pointer;
use crate::serializer::SerializerObject;

/// A user-defined type whose single `serialize` body defines both its read
/// and write wire format. Implementations must be default-constructible so
/// the deserializer can allocate a placeholder before its fields are known
/// (required for cyclic object graphs — see [`crate::context::ObjectCache`]).
pub trait Serializable: Default + 'static
{
    /// Called once, immediately after construction and before `serialize`,
    /// at the absolute pointer this instance was (or will be) placed at.
    fn init(&mut self, pointer: Pointer);

    /// The declarative body: call `ser.serialize(...)` operations in field
    /// order. The same body reads or writes depending on which concrete
    /// `SerializerObject` is passed.
    fn serialize<S: SerializerObject>(&mut self, ser: &mut S) -> Result<(), SerializeError>;

    /// Size in bytes this instance occupied, set by the engine after
    /// `serialize` returns (`end_pos - start_pos`).
    fn size(&self) -> u64;
    fn set_size(&mut self, size: u64);

    /// Suppresses per-field logging inside this instance's `serialize` call,
    /// replacing it with one summary line (`short_log`).
    fn is_short_log(&self) -> bool
    {
        false
    }

    fn short_log(&self) -> String
    {
        String::new()
    }
}
