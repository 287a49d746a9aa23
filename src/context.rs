//!
//! The process-local universe of one serialization task: registered files,
//! the object cache, the memory map, and logging/encoding defaults.
//!
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use encoding_rs::Encoding;

use crate::error::ContextError;
use crate::error::SerializeError;
use crate::file::BinaryFile;
use crate::file::FileId;
use crate::file_manager::FileManager;
use crate::pointer::Pointer;

/// Keyed store of already-constructed objects, indexed by absolute pointer.
/// Consulted before construction so cyclic object graphs terminate: the
/// instance is inserted (via [`ObjectCache::add`]) immediately after
/// `init(pointer)` runs and before its body serializes, so any
/// back-reference encountered mid-body resolves to the same, still-being-built
/// instance.
///
/// Identity matters here, not just value equality — two calls to
/// `serializeObject` at the same pointer must return the *same* object.
/// `Rc<RefCell<T>>` is the natural way to express that sharing in Rust, so
/// this cache stores `Rc<dyn Any>` wrapping `RefCell<T>` and downcasts on
/// lookup.
#[derive(Default)]
pub struct ObjectCache
{
    entries: HashMap<Pointer, Rc<dyn Any>>,
}

impl ObjectCache
{
    pub fn add<T: Any>(&mut self, pointer: &Pointer, obj: Rc<RefCell<T>>)
    {
        self.entries.insert(pointer.clone(), obj as Rc<dyn Any>);
    }

    pub fn from_offset<T: Any>(&self, pointer: &Pointer) -> Option<Rc<RefCell<T>>>
    {
        self.entries.get(pointer).and_then(|rc| rc.clone().downcast::<RefCell<T>>().ok())
    }

    pub fn contains(&self, pointer: &Pointer) -> bool
    {
        self.entries.contains_key(pointer)
    }
}

/// An indexed, priority-ordered view of the context's memory-mapped files,
/// used to resolve cross-file pointers. Rebuilt whenever the file registry
/// changes, so resolution always sees the current set.
#[derive(Default)]
pub struct MemoryMap
{
    /// `(priority, insertion_order, file_id)`, sorted by priority descending
    /// then insertion order ascending so ties resolve to whichever
    /// memory-mapped file was registered first.
    entries: Vec<(i32, usize, FileId)>,
}

impl MemoryMap
{
    fn rebuild(&mut self, files: &HashMap<FileId, Box<dyn BinaryFile>>, order: &[FileId])
    {
        self.entries.clear();
        for (insertion_order, id) in order.iter().enumerate() {
            if let Some(file) = files.get(id) {
                if file.is_memory_mapped() {
                    self.entries.push((file.memory_mapped_priority(), insertion_order, *id));
                }
            }
        }
        self.entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    }

    /// Finds the highest-priority memory-mapped file whose address range
    /// contains `absolute_value`, ties broken by registration order.
    pub fn resolve(&self, files: &HashMap<FileId, Box<dyn BinaryFile>>, absolute_value: u64) -> Option<FileId>
    {
        self.entries
            .iter()
            .find(|(_, _, id)| files.get(id).map(|f| f.core().contains_absolute(absolute_value)).unwrap_or(false))
            .map(|(_, _, id)| *id)
    }
}

/// The process-local universe of one serialization task.
pub struct Context
{
    manager: Box<dyn FileManager>,
    files: HashMap<FileId, Box<dyn BinaryFile>>,
    key_to_id: HashMap<String, FileId>,
    registration_order: Vec<FileId>,
    memory_map: MemoryMap,
    next_id: u32,
    pub cache: ObjectCache,
    logging_enabled: bool,
    default_encoding: &'static Encoding,
    disposed: bool,
}

impl Context
{
    pub fn new(manager: Box<dyn FileManager>) -> Self
    {
        Self {
            manager,
            files: HashMap::new(),
            key_to_id: HashMap::new(),
            registration_order: Vec::new(),
            memory_map: MemoryMap::default(),
            next_id: 0,
            cache: ObjectCache::default(),
            logging_enabled: false,
            default_encoding: encoding_rs::UTF_8,
            disposed: false,
        }
    }

    pub fn with_logging(mut self, enabled: bool) -> Self
    {
        self.logging_enabled = enabled;
        self
    }

    pub fn with_default_encoding(mut self, encoding: &'static Encoding) -> Self
    {
        self.default_encoding = encoding;
        self
    }

    pub fn default_encoding(&self) -> &'static Encoding
    {
        self.default_encoding
    }

    pub fn manager(&self) -> &dyn FileManager
    {
        self.manager.as_ref()
    }

    pub fn is_disposed(&self) -> bool
    {
        self.disposed
    }

    fn check_disposed(&self) -> Result<(), SerializeError>
    {
        if self.disposed {
            Err(SerializeError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Registers a file under `key`, failing with `DuplicateFile` if the key
    /// is already taken. Returns the file's stable handle.
    pub fn add_file(&mut self, key: impl Into<String>, file: Box<dyn BinaryFile>) -> Result<FileId, SerializeError>
    {
        self.check_disposed()?;
        let key = key.into();
        if self.key_to_id.contains_key(&key) {
            return Err(ContextError::DuplicateFile { key }.into());
        }

        let id = file.core().id;
        self.key_to_id.insert(key, id);
        self.registration_order.push(id);
        self.files.insert(id, file);
        self.memory_map.rebuild(&self.files, &self.registration_order);
        Ok(id)
    }

    /// Allocates the next `FileId`. Callers construct their `BinaryFile`
    /// variant with this id, then pass it to [`Context::add_file`].
    pub fn allocate_file_id(&mut self) -> FileId
    {
        let id = FileId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Commits `id`'s writer (flush, or re-encode-and-splice for variants
    /// that need it) without disposing the whole context. Callers that only
    /// want one file's pending writes durable should reach for this instead
    /// of [`Context::dispose`].
    pub fn end_write(&mut self, id: FileId) -> Result<(), SerializeError>
    {
        let (file, manager) = self.file_mut_and_manager(id)?;
        file.end_write(manager)
    }

    pub fn remove_file(&mut self, id: FileId) -> Result<Box<dyn BinaryFile>, SerializeError>
    {
        self.check_disposed()?;
        let file = self.files.remove(&id).ok_or_else(|| ContextError::UnknownFile { key: format!("{id:?}") })?;
        self.key_to_id.retain(|_, v| *v != id);
        self.registration_order.retain(|v| *v != id);
        self.memory_map.rebuild(&self.files, &self.registration_order);
        Ok(file)
    }

    pub fn get_file(&self, key: &str) -> Result<FileId, SerializeError>
    {
        self.key_to_id.get(key).copied().ok_or_else(|| ContextError::UnknownFile { key: key.to_string() }.into())
    }

    pub fn normalize_path(path: &str) -> String
    {
        path.replace('\\', "/")
    }

    pub fn file(&self, id: FileId) -> Result<&dyn BinaryFile, SerializeError>
    {
        self.files.get(&id).map(|f| f.as_ref()).ok_or_else(|| ContextError::UnknownFile { key: format!("{id:?}") }.into())
    }

    pub fn file_mut(&mut self, id: FileId) -> Result<&mut Box<dyn BinaryFile>, SerializeError>
    {
        self.files.get_mut(&id).ok_or_else(|| ContextError::UnknownFile { key: format!("{id:?}") }.into())
    }

    /// As [`Context::file_mut`], plus the file manager borrowed alongside it.
    /// Exists because `file_mut(id)?` followed by `self.manager()` borrows
    /// `self` twice through method calls, which the borrow checker can't see
    /// are disjoint fields; this reaches into both fields directly in one
    /// function body where it can.
    pub fn file_mut_and_manager(&mut self, id: FileId) -> Result<(&mut Box<dyn BinaryFile>, &dyn FileManager), SerializeError>
    {
        let manager: &dyn FileManager = self.manager.as_ref();
        let file = self.files.get_mut(&id).ok_or_else(|| ContextError::UnknownFile { key: format!("{id:?}") })?;
        Ok((file, manager))
    }

    pub fn files(&self) -> &HashMap<FileId, Box<dyn BinaryFile>>
    {
        &self.files
    }

    /// Resolves a pointer-wire value, honoring override tables and the
    /// memory map:
    /// 1. the current file's override table, if an entry exists at `offset`;
    /// 2. memory-mapped files, highest priority first, range-checked;
    /// 3. non-memory-mapped files check only themselves;
    /// 4. stream files delegate to the memory map unless `allow_local_pointers`.
    pub fn resolve_pointer(&self, current_file: FileId, offset_in_current_file: u64, serialized_value: u64, anchor: Option<&Pointer>) -> Option<Pointer>
    {
        let current = self.files.get(&current_file)?;

        if let Some(overridden) = current.core().override_pointers.get(&offset_in_current_file) {
            return Some(overridden.clone());
        }

        let anchor_offset = anchor.map(|a| a.absolute_offset).unwrap_or(0);
        let absolute_value = serialized_value.wrapping_add(anchor_offset);

        if current.is_memory_mapped() {
            return self
                .memory_map
                .resolve(&self.files, absolute_value)
                .map(|id| Pointer { absolute_offset: absolute_value, file: id, anchor: anchor.cloned().map(Box::new) });
        }

        if current.is_stream() && !current.allow_local_pointers() {
            return self
                .memory_map
                .resolve(&self.files, absolute_value)
                .map(|id| Pointer { absolute_offset: absolute_value, file: id, anchor: anchor.cloned().map(Box::new) });
        }

        // Non-memory-mapped files (and streams with `allow_local_pointers`)
        // range-check against themselves only.
        if current.core().contains_absolute(absolute_value) {
            Some(Pointer { absolute_offset: absolute_value, file: current_file, anchor: anchor.cloned().map(Box::new) })
        } else {
            None
        }
    }

    /// Disposes the context: closes every registered file. All subsequent
    /// operations against this context must fail with `Disposed`.
    pub fn dispose(&mut self) -> Result<(), SerializeError>
    {
        for file in self.files.values_mut() {
            let _ = file.end_read();
            let _ = file.end_write(self.manager.as_ref());
        }
        self.disposed = true;
        Ok(())
    }

    pub fn log_enabled(&self) -> bool
    {
        self.logging_enabled
    }

    /// Emits one log line per the contract: `"(READ|WRITE) {pointer}:  {indent}{message}"`.
    pub fn log(&self, reading: bool, pointer: &Pointer, depth: usize, message: &str)
    {
        if !self.logging_enabled {
            return;
        }
        let role = if reading { "READ" } else { "WRITE" };
        let indent = "  ".repeat(depth);
        tracing::debug!("({role}) {pointer}:  {indent}{message}");
    }

    pub fn warn(&self, reading: bool, pointer: &Pointer, depth: usize, message: &str)
    {
        let role = if reading { "READ" } else { "WRITE" };
        let indent = "  ".repeat(depth);
        tracing::warn!("({role}) {pointer}:  {indent}{message}");
    }
}

impl Drop for Context
{
    fn drop(&mut self)
    {
        if !self.disposed {
            let _ = self.dispose();
        }
    }
}
