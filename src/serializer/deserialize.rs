//!
//! The read direction of [`super::SerializerObject`].
//!
use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;

use crate::context::Context;
use crate::encoder::Encoder;
use crate::endian::Endianness;
use crate::error::pointer_site;
use crate::error::IoError;
use crate::error::PointerError;
use crate::error::SerializeError;
use crate::file::FileId;
use crate::file::StreamFile;
use crate::filters::ChecksumCalculator;
use crate::filters::XorCalculator;
use crate::pointer::Pointer;
use crate::pointer::TypedPointer;
use crate::serializable::Serializable;

use super::bits::BitAccess;
use super::bits::BitContainer;
use super::bits::BitCursor;
use super::primitive::Primitive;
use super::SerializerObject;

/// Read implementation of [`SerializerObject`]. Drives one logical cursor
/// (current file + current position within it) over a [`Context`].
pub struct BinaryDeserializer<'ctx>
{
    ctx: &'ctx mut Context,
    current_file: FileId,
    depth: usize,
    mute_count: usize,
    xor_stack: Vec<Option<Box<dyn XorCalculator>>>,
    checksum_stack: Vec<Option<Box<dyn ChecksumCalculator>>>,
}

impl<'ctx> BinaryDeserializer<'ctx>
{
    pub fn new(ctx: &'ctx mut Context, start: Pointer) -> Result<Self, SerializeError>
    {
        let mut this = Self {
            ctx,
            current_file: start.file,
            depth: 0,
            mute_count: 0,
            xor_stack: Vec::new(),
            checksum_stack: Vec::new(),
        };
        this.goto(&start)?;
        Ok(this)
    }

    fn mark_read(&mut self, start_offset: u64, count: u64) -> Result<(), SerializeError>
    {
        self.ctx.file_mut(self.current_file)?.core_mut().mark_read(start_offset, count);
        Ok(())
    }

    fn position(&mut self) -> Result<u64, SerializeError>
    {
        let current_file = self.current_file;
        let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
        let reader = file.create_reader(manager)?;
        reader.position().map_err(|e| IoError::Io(e).into())
    }

    fn seek_current(&mut self, offset: u64) -> Result<(), SerializeError>
    {
        let current_file = self.current_file;
        let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
        let reader = file.create_reader(manager)?;
        reader.seek(offset).map_err(IoError::Io)?;
        Ok(())
    }

    fn base_address(&self) -> Result<u64, SerializeError>
    {
        Ok(self.ctx.file(self.current_file)?.core().base_address)
    }

    fn read_raw_uint(&mut self, width: usize) -> Result<u64, SerializeError>
    {
        let current_file = self.current_file;
        let start = self.position()?;
        let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
        let reader = file.create_reader(manager)?;
        let value = match width {
            4 => reader.read_u32().map_err(IoError::Io)? as u64,
            8 => reader.read_u64().map_err(IoError::Io)?,
            _ => return Err(SerializeError::NotSupportedType { type_name: "pointer width other than 32/64 bits" }),
        };
        self.mark_read(start, width as u64)?;
        Ok(value)
    }

    /// Reads the pointer field at the current position, returning its
    /// location, its offset within the current file (the key the override
    /// table is indexed by) and the raw wire value.
    fn pointer_field(&mut self) -> Result<(Pointer, u64, u64), SerializeError>
    {
        let current_file = self.current_file;
        let pointer_size = self.ctx.file(current_file)?.core().pointer_size;
        let field_pointer = self.current_pointer()?;
        let base = self.base_address()?;
        let raw = self.read_raw_uint(pointer_size.byte_width())?;
        Ok((field_pointer.clone(), field_pointer.file_offset(base), raw))
    }
}

impl<'ctx> SerializerObject for BinaryDeserializer<'ctx>
{
    fn is_reading(&self) -> bool
    {
        true
    }

    fn current_pointer(&mut self) -> Result<Pointer, SerializeError>
    {
        let offset = self.position()?;
        let base = self.base_address()?;
        Ok(Pointer::new(base + offset, self.current_file))
    }

    fn current_file(&self) -> FileId
    {
        self.current_file
    }

    fn serialize<T: Primitive>(&mut self, _value: T, name: Option<&str>) -> Result<T, SerializeError>
    {
        let current_file = self.current_file;
        let start = self.position()?;

        let (result, malformed_bool) = {
            let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
            let reader = file.create_reader(manager)?;
            let value = T::read(reader)?;
            (value, reader.take_last_bool_malformed())
        };

        let end = self.position()?;
        self.mark_read(start, end - start)?;

        if let Some(true) = malformed_bool {
            let pointer = self.current_pointer()?;
            self.ctx.warn(true, &pointer, self.depth, &format!("malformed bool read for {}", name.unwrap_or("<no name>")));
        }

        self.log(&format!("{} ({})", name.unwrap_or("<no name>"), T::type_name()));

        Ok(result)
    }

    fn serialize_string(
        &mut self,
        _value: &str,
        length: Option<usize>,
        encoding: Option<&'static Encoding>,
        name: Option<&str>,
    ) -> Result<String, SerializeError>
    {
        let current_file = self.current_file;
        let start = self.position()?;
        let encoding = encoding.unwrap_or_else(|| self.ctx.default_encoding());

        let bytes = {
            let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
            let reader = file.create_reader(manager)?;
            match length {
                Some(len) => reader.read_bytes(len).map_err(IoError::Io)?,
                None => reader.read_until_null().map_err(IoError::Io)?,
            }
        };

        let end = self.position()?;
        self.mark_read(start, end - start)?;

        let (decoded, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            return Err(crate::error::EncodingError::Decode { byte_count: bytes.len(), encoding: encoding.name() }.into());
        }

        self.log(&format!("{} (string) = {decoded:?}", name.unwrap_or("<no name>")));

        Ok(decoded.into_owned())
    }

    fn serialize_object<T: Serializable>(
        &mut self,
        _value: Rc<RefCell<T>>,
        on_pre_serialize: Option<&mut dyn FnMut(&mut T)>,
        name: Option<&str>,
    ) -> Result<Rc<RefCell<T>>, SerializeError>
    {
        let pointer = self.current_pointer()?;
        let current_file = self.current_file;
        let ignore_cache = self.ctx.file(current_file)?.core().ignore_cache_on_read;

        if !ignore_cache {
            if let Some(cached) = self.ctx.cache.from_offset::<T>(&pointer) {
                let size = cached.borrow().size();
                let start = self.position()?;
                self.seek_current(start + size)?;
                self.log(&format!("{}: cache hit, {size} bytes", name.unwrap_or("<no name>")));
                return Ok(cached);
            }
        }

        let instance = Rc::new(RefCell::new(T::default()));
        instance.borrow_mut().init(pointer.clone());
        self.ctx.cache.add(&pointer, instance.clone());

        if let Some(f) = on_pre_serialize {
            f(&mut instance.borrow_mut());
        }

        let is_short = instance.borrow().is_short_log();
        let start = self.current_pointer()?.absolute_offset;

        self.depth += 1;
        if is_short {
            self.mute_count += 1;
        }
        let result = instance.borrow_mut().serialize(self);
        if is_short {
            self.mute_count -= 1;
        }
        self.depth -= 1;
        result?;

        let end = self.current_pointer()?.absolute_offset;
        instance.borrow_mut().set_size(end - start);

        if is_short {
            let summary = instance.borrow().short_log();
            self.log(&summary);
        } else {
            self.log(&format!("{}: object, {} bytes", name.unwrap_or("<no name>"), end - start));
        }

        Ok(instance)
    }

    fn serialize_pointer(
        &mut self,
        _value: Option<Pointer>,
        anchor: Option<&Pointer>,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Option<Pointer>, SerializeError>
    {
        let current_file = self.current_file;
        let (field_pointer, field_offset, raw) = self.pointer_field()?;

        self.log(&format!("{} (pointer) = {raw:#x}", name.unwrap_or("<no name>")));

        if raw == 0 {
            return Ok(None);
        }

        match self.ctx.resolve_pointer(current_file, field_offset, raw, anchor) {
            Some(p) => Ok(Some(p)),
            None => {
                let allowed = allow_invalid || self.ctx.file(current_file)?.allow_invalid_pointer(raw, anchor);
                if allowed {
                    Ok(None)
                } else {
                    Err(PointerError::InvalidPointer { value: raw, site: pointer_site(&field_pointer) }.into())
                }
            }
        }
    }

    fn serialize_pointer_object<T: Serializable>(
        &mut self,
        _value: Option<TypedPointer<T>>,
        anchor: Option<&Pointer>,
        resolve: bool,
        on_pre_serialize: Option<&mut dyn FnMut(&mut T)>,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Option<TypedPointer<T>>, SerializeError>
    {
        let resolved = self.serialize_pointer(None, anchor, allow_invalid, name)?;

        let Some(p) = resolved else {
            return Ok(None);
        };

        if !resolve {
            return Ok(Some(TypedPointer::unresolved(p)));
        }

        let placeholder = Rc::new(RefCell::new(T::default()));
        let target = self
            .do_at(Some(&p), |this| this.serialize_object(placeholder.clone(), on_pre_serialize, name))?
            .expect("Some(p) always runs its body");

        Ok(Some(TypedPointer::resolved(p, target)))
    }

    fn serialize_array<T: Primitive>(&mut self, mut buf: Vec<T>, count: usize, name: Option<&str>) -> Result<Vec<T>, SerializeError>
    {
        buf.clear();
        for i in 0..count {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            let value = self.serialize(T::default(), item_name.as_deref())?;
            buf.push(value);
        }
        Ok(buf)
    }

    fn serialize_byte_array(&mut self, mut buf: Vec<u8>, count: usize, name: Option<&str>) -> Result<Vec<u8>, SerializeError>
    {
        let current_file = self.current_file;
        let start = self.position()?;
        let bytes = {
            let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
            let reader = file.create_reader(manager)?;
            reader.read_bytes(count).map_err(IoError::Io)?
        };
        self.mark_read(start, count as u64)?;
        buf.clear();
        buf.extend_from_slice(&bytes);
        self.log(&format!("{} (bytes[{count}])", name.unwrap_or("<no name>")));
        Ok(buf)
    }

    fn serialize_object_array<T: Serializable>(
        &mut self,
        mut buf: Vec<Rc<RefCell<T>>>,
        count: usize,
        name: Option<&str>,
    ) -> Result<Vec<Rc<RefCell<T>>>, SerializeError>
    {
        buf.clear();
        for i in 0..count {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            let placeholder = Rc::new(RefCell::new(T::default()));
            let value = self.serialize_object(placeholder, None, item_name.as_deref())?;
            buf.push(value);
        }
        Ok(buf)
    }

    fn serialize_pointer_array(
        &mut self,
        mut buf: Vec<Option<Pointer>>,
        count: usize,
        anchor: Option<&Pointer>,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Vec<Option<Pointer>>, SerializeError>
    {
        buf.clear();
        for i in 0..count {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            let value = self.serialize_pointer(None, anchor, allow_invalid, item_name.as_deref())?;
            buf.push(value);
        }
        Ok(buf)
    }

    fn serialize_pointer_object_array<T: Serializable>(
        &mut self,
        mut buf: Vec<Option<TypedPointer<T>>>,
        count: usize,
        anchor: Option<&Pointer>,
        resolve: bool,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Vec<Option<TypedPointer<T>>>, SerializeError>
    {
        buf.clear();
        for i in 0..count {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            let value = self.serialize_pointer_object(None, anchor, resolve, None, allow_invalid, item_name.as_deref())?;
            buf.push(value);
        }
        Ok(buf)
    }

    fn serialize_string_array(
        &mut self,
        mut buf: Vec<String>,
        count: usize,
        length: Option<usize>,
        encoding: Option<&'static Encoding>,
        name: Option<&str>,
    ) -> Result<Vec<String>, SerializeError>
    {
        buf.clear();
        for i in 0..count {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            let value = self.serialize_string("", length, encoding, item_name.as_deref())?;
            buf.push(value);
        }
        Ok(buf)
    }

    fn serialize_array_size<U: Primitive + TryInto<usize> + TryFrom<usize>>(&mut self, _len: usize, name: Option<&str>) -> Result<usize, SerializeError>
    {
        let value = self.serialize(U::default(), name)?;
        value.try_into().map_err(|_| SerializeError::NotSupportedType { type_name: "array size prefix overflowed usize" })
    }

    fn serialize_bit_values<T: BitContainer>(&mut self, body: &mut dyn FnMut(&mut dyn BitAccess), name: Option<&str>) -> Result<T, SerializeError>
    {
        let raw = self.serialize(T::default(), name)?;
        let mut cursor = BitCursor::for_read(raw.clone().to_bits());
        body(&mut cursor);
        Ok(raw)
    }

    fn serialize_checksum<T: Primitive + PartialEq>(&mut self, expected: T, name: Option<&str>) -> Result<T, SerializeError>
    {
        let value = self.serialize(T::default(), name)?;
        if value != expected {
            let pointer = self.current_pointer()?;
            self.ctx.warn(true, &pointer, self.depth, &format!("checksum mismatch on {}", name.unwrap_or("<no name>")));
        }
        Ok(value)
    }

    fn goto(&mut self, pointer: &Pointer) -> Result<(), SerializeError>
    {
        self.current_file = pointer.file;
        let base = self.base_address()?;
        let target = pointer.file_offset(base);
        self.seek_current(target)
    }

    fn do_at<R>(&mut self, pointer: Option<&Pointer>, body: impl FnOnce(&mut Self) -> Result<R, SerializeError>) -> Result<Option<R>, SerializeError>
    {
        let Some(p) = pointer else {
            return Ok(None);
        };

        let saved_file = self.current_file;
        let saved_pos = self.position()?;

        self.goto(p)?;
        let result = body(self);

        self.current_file = saved_file;
        self.seek_current(saved_pos)?;

        result.map(Some)
    }

    fn do_endian<R>(&mut self, endianness: Endianness, body: impl FnOnce(&mut Self) -> Result<R, SerializeError>) -> Result<R, SerializeError>
    {
        let current_file = self.current_file;
        let previous = {
            let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
            let reader = file.create_reader(manager)?;
            let previous = reader.is_little_endian;
            reader.is_little_endian = endianness.is_little();
            previous
        };

        let result = body(self);

        if let Ok(file) = self.ctx.file_mut(current_file) {
            if let Some(reader) = file.core_mut().reader.as_mut() {
                reader.is_little_endian = previous;
            }
        }

        result
    }

    fn do_encoded<R>(
        &mut self,
        encoder: Box<dyn Encoder>,
        endianness: Option<Endianness>,
        allow_local_pointers: bool,
        body: impl FnOnce(&mut Self) -> Result<R, SerializeError>,
    ) -> Result<R, SerializeError>
    {
        let current_file = self.current_file;
        let outer_endianness = self.ctx.file(current_file)?.core().endianness;

        let remainder = {
            let start = self.position()?;
            let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
            let reader = file.create_reader(manager)?;
            let length = reader.length().map_err(IoError::Io)?;
            let remaining = (length - start) as usize;
            reader.read_bytes(remaining).map_err(IoError::Io)?
        };
        let outer_len = remainder.len() as u64;
        let outer_start = self.position()? - outer_len;
        self.mark_read(outer_start, outer_len)?;

        let decoded = encoder.decode(&remainder)?;
        let decoded_len = decoded.len() as u64;

        let stream_id = self.ctx.allocate_file_id();
        let stream_key = format!("__encoded_{}_{}", current_file.0, stream_id.0);
        let stream = StreamFile::new(stream_id, stream_key.clone(), decoded, endianness.unwrap_or(outer_endianness), allow_local_pointers);
        self.ctx.add_file(stream_key, Box::new(stream))?;

        let inner_start = Pointer::new(0, stream_id);
        let saved_file = self.current_file;
        self.goto(&inner_start)?;

        let result = body(self);

        let inner_pos = self.position().unwrap_or(decoded_len);
        if inner_pos != decoded_len {
            let pointer = self.current_pointer().unwrap_or_else(|_| Pointer::new(0, stream_id));
            self.ctx.warn(true, &pointer, self.depth, &format!("encoded block under-consumed: read {inner_pos} of {decoded_len} bytes"));
        }

        let _ = self.ctx.remove_file(stream_id);
        self.current_file = saved_file;

        result
    }

    fn begin_xor(&mut self, filter: Box<dyn XorCalculator>)
    {
        let current_file = self.current_file;
        if let Ok(file) = self.ctx.file_mut(current_file) {
            if let Some(reader) = file.core_mut().reader.as_mut() {
                let previous = reader.begin_xor(filter);
                self.xor_stack.push(previous);
                return;
            }
        }
        self.xor_stack.push(None);
    }

    fn end_xor(&mut self)
    {
        let previous = self.xor_stack.pop().flatten();
        let current_file = self.current_file;
        if let Ok(file) = self.ctx.file_mut(current_file) {
            if let Some(reader) = file.core_mut().reader.as_mut() {
                reader.end_xor(previous);
            }
        }
    }

    fn begin_calculate_checksum(&mut self, calculator: Box<dyn ChecksumCalculator>)
    {
        let current_file = self.current_file;
        if let Ok(file) = self.ctx.file_mut(current_file) {
            if let Some(reader) = file.core_mut().reader.as_mut() {
                let previous = reader.begin_checksum(calculator);
                self.checksum_stack.push(previous);
                return;
            }
        }
        self.checksum_stack.push(None);
    }

    fn end_calculate_checksum(&mut self) -> u64
    {
        let previous = self.checksum_stack.pop().flatten();
        let current_file = self.current_file;
        if let Ok(file) = self.ctx.file_mut(current_file) {
            if let Some(reader) = file.core_mut().reader.as_mut() {
                return reader.end_checksum(previous);
            }
        }
        0
    }

    fn log(&mut self, message: &str)
    {
        if self.mute_count > 0 {
            return;
        }
        if let Ok(pointer) = self.current_pointer() {
            self.ctx.log(true, &pointer, self.depth, message);
        }
    }
}
