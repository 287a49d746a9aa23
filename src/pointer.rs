//!
//! Typed and untyped absolute addresses.
//!
use std::cell::RefCell;
use std::rc::Rc;

use crate::file::FileId;

/// An absolute address into one of the context's registered files, optionally
/// relative to an anchor.
///
/// Equality and hashing ignore the anchor: two pointers are the same key into
/// the object cache iff they share `(file, absolute_offset)`.
#[derive(Debug, Clone)]
pub struct Pointer
{
    pub absolute_offset: u64,
    pub file:            FileId,
    pub anchor:          Option<Box<Pointer>>,
}

impl Pointer
{
    pub fn new(absolute_offset: u64, file: FileId) -> Self
    {
        Self { absolute_offset, file, anchor: None }
    }

    pub fn with_anchor(absolute_offset: u64, file: FileId, anchor: Pointer) -> Self
    {
        Self { absolute_offset, file, anchor: Some(Box::new(anchor)) }
    }

    /// Offset relative to `file`'s base address.
    pub fn file_offset(&self, base_address: u64) -> u64
    {
        self.absolute_offset - base_address
    }

    /// The value that would be written on the wire: absolute offset minus the
    /// anchor's absolute offset (0 if there is no anchor).
    pub fn serialized_value(&self) -> u64
    {
        let anchor_offset = self.anchor.as_ref().map(|a| a.absolute_offset).unwrap_or(0);
        self.absolute_offset.wrapping_sub(anchor_offset)
    }

    /// Returns a new pointer with the same absolute target but a different anchor.
    pub fn set_anchor(&self, anchor: Option<Pointer>) -> Pointer
    {
        Pointer { absolute_offset: self.absolute_offset, file: self.file, anchor: anchor.map(Box::new) }
    }

    pub fn offset_by(&self, delta: i64) -> Pointer
    {
        Pointer {
            absolute_offset: (self.absolute_offset as i64 + delta) as u64,
            file: self.file,
            anchor: self.anchor.clone(),
        }
    }
}

impl PartialEq for Pointer
{
    fn eq(&self, other: &Self) -> bool
    {
        self.file == other.file && self.absolute_offset == other.absolute_offset
    }
}
impl Eq for Pointer {}

impl std::hash::Hash for Pointer
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H)
    {
        self.file.hash(state);
        self.absolute_offset.hash(state);
    }
}

impl std::ops::Add<i64> for Pointer
{
    type Output = Pointer;
    fn add(self, rhs: i64) -> Pointer
    {
        self.offset_by(rhs)
    }
}

impl std::ops::Sub<i64> for Pointer
{
    type Output = Pointer;
    fn sub(self, rhs: i64) -> Pointer
    {
        self.offset_by(-rhs)
    }
}

impl std::fmt::Display for Pointer
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "{:#010x}@{:?}", self.absolute_offset, self.file)
    }
}

/// A pointer plus a deferred target of type `T`. The target is populated
/// either eagerly at construction time (`resolve = true`) or left absent for
/// the caller to fetch later through the object cache at `pointer`.
///
/// Shares the target through `Rc<RefCell<T>>` rather than owning `T`
/// directly, matching [`crate::context::ObjectCache`]'s identity semantics —
/// a resolved `TypedPointer` and a cache hit for the same address refer to
/// the same instance.
#[derive(Clone)]
pub struct TypedPointer<T>
{
    pub pointer: Pointer,
    pub target:  Option<Rc<RefCell<T>>>,
}

impl<T> TypedPointer<T>
{
    pub fn unresolved(pointer: Pointer) -> Self
    {
        Self { pointer, target: None }
    }

    pub fn resolved(pointer: Pointer, target: Rc<RefCell<T>>) -> Self
    {
        Self { pointer, target: Some(target) }
    }

    pub fn is_resolved(&self) -> bool
    {
        self.target.is_some()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TypedPointer<T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("TypedPointer").field("pointer", &self.pointer).field("resolved", &self.is_resolved()).finish()
    }
}
