//!
//! The write direction of [`super::SerializerObject`], mirroring
//! [`super::deserialize::BinaryDeserializer`] operation-for-operation.
//!
use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;

use crate::context::Context;
use crate::encoder::Encoder;
use crate::endian::Endianness;
use crate::error::pointer_site;
use crate::error::EncodingError;
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

/// Write implementation of [`SerializerObject`]. Every field value is
/// already known — supplied by the caller — so the bodies here never
/// construct placeholders; they commit bytes and, for the nested scopes
/// (encoded blocks, endianness, xor/checksum), mirror the read side's scope
/// bookkeeping exactly.
pub struct BinarySerializer<'ctx>
{
    ctx: &'ctx mut Context,
    current_file: FileId,
    depth: usize,
    mute_count: usize,
    xor_stack: Vec<Option<Box<dyn XorCalculator>>>,
    checksum_stack: Vec<Option<Box<dyn ChecksumCalculator>>>,
}

impl<'ctx> BinarySerializer<'ctx>
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

    fn position(&mut self) -> Result<u64, SerializeError>
    {
        let current_file = self.current_file;
        let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
        let writer = file.create_writer(manager)?;
        writer.position().map_err(|e| IoError::Io(e).into())
    }

    fn seek_current(&mut self, offset: u64) -> Result<(), SerializeError>
    {
        let current_file = self.current_file;
        let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
        let writer = file.create_writer(manager)?;
        writer.seek(offset).map_err(IoError::Io)?;
        Ok(())
    }

    fn base_address(&self) -> Result<u64, SerializeError>
    {
        Ok(self.ctx.file(self.current_file)?.core().base_address)
    }

    fn write_raw_uint(&mut self, width: usize, value: u64) -> Result<(), SerializeError>
    {
        let current_file = self.current_file;
        let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
        let writer = file.create_writer(manager)?;
        match width {
            4 => writer.write_u32(value as u32).map_err(IoError::Io)?,
            8 => writer.write_u64(value).map_err(IoError::Io)?,
            _ => return Err(SerializeError::NotSupportedType { type_name: "pointer width other than 32/64 bits" }),
        }
        Ok(())
    }
}

impl<'ctx> SerializerObject for BinarySerializer<'ctx>
{
    fn is_reading(&self) -> bool
    {
        false
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

    fn serialize<T: Primitive>(&mut self, value: T, name: Option<&str>) -> Result<T, SerializeError>
    {
        let current_file = self.current_file;
        {
            let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
            let writer = file.create_writer(manager)?;
            T::write(writer, &value)?;
        }

        self.log(&format!("{} ({})", name.unwrap_or("<no name>"), T::type_name()));
        Ok(value)
    }

    fn serialize_string(
        &mut self,
        value: &str,
        length: Option<usize>,
        encoding: Option<&'static Encoding>,
        name: Option<&str>,
    ) -> Result<String, SerializeError>
    {
        let current_file = self.current_file;
        let encoding = encoding.unwrap_or_else(|| self.ctx.default_encoding());

        let (encoded, _, had_errors) = encoding.encode(value);
        if had_errors {
            return Err(EncodingError::Encode { char_count: value.chars().count(), encoding: encoding.name() }.into());
        }

        {
            let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
            let writer = file.create_writer(manager)?;
            match length {
                Some(len) => {
                    let mut padded = encoded.into_owned();
                    padded.resize(len, 0);
                    writer.write_bytes(&padded)?;
                }
                None => writer.write_null_terminated(&encoded)?,
            }
        }

        self.log(&format!("{} (string) = {value:?}", name.unwrap_or("<no name>")));
        Ok(value.to_string())
    }

    fn serialize_object<T: Serializable>(
        &mut self,
        value: Rc<RefCell<T>>,
        on_pre_serialize: Option<&mut dyn FnMut(&mut T)>,
        name: Option<&str>,
    ) -> Result<Rc<RefCell<T>>, SerializeError>
    {
        if let Some(f) = on_pre_serialize {
            f(&mut value.borrow_mut());
        }

        let is_short = value.borrow().is_short_log();
        let start = self.current_pointer()?.absolute_offset;

        self.depth += 1;
        if is_short {
            self.mute_count += 1;
        }
        let result = value.borrow_mut().serialize(self);
        if is_short {
            self.mute_count -= 1;
        }
        self.depth -= 1;
        result?;

        let end = self.current_pointer()?.absolute_offset;
        value.borrow_mut().set_size(end - start);

        if is_short {
            let summary = value.borrow().short_log();
            self.log(&summary);
        } else {
            self.log(&format!("{}: object, {} bytes", name.unwrap_or("<no name>"), end - start));
        }

        Ok(value)
    }

    fn serialize_pointer(
        &mut self,
        value: Option<Pointer>,
        anchor: Option<&Pointer>,
        _allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Option<Pointer>, SerializeError>
    {
        let current_file = self.current_file;
        let pointer_size = self.ctx.file(current_file)?.core().pointer_size;

        let raw = match &value {
            None => 0,
            Some(p) => {
                let anchor_offset = anchor.map(|a| a.absolute_offset).unwrap_or(0);
                p.absolute_offset.wrapping_sub(anchor_offset)
            }
        };

        self.write_raw_uint(pointer_size.byte_width(), raw)?;
        self.log(&format!("{} (pointer) = {raw:#x}", name.unwrap_or("<no name>")));
        Ok(value)
    }

    fn serialize_pointer_object<T: Serializable>(
        &mut self,
        value: Option<TypedPointer<T>>,
        anchor: Option<&Pointer>,
        resolve: bool,
        on_pre_serialize: Option<&mut dyn FnMut(&mut T)>,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Option<TypedPointer<T>>, SerializeError>
    {
        let Some(typed) = value else {
            self.serialize_pointer(None, anchor, allow_invalid, name)?;
            return Ok(None);
        };

        self.serialize_pointer(Some(typed.pointer.clone()), anchor, allow_invalid, name)?;

        if resolve {
            if let Some(target) = typed.target.clone() {
                self.do_at(Some(&typed.pointer), |this| this.serialize_object(target, on_pre_serialize, name))?;
            } else {
                return Err(PointerError::PointerException { reason: format!("resolve=true for {} but no target object was supplied", pointer_site(&typed.pointer)) }.into());
            }
        }

        Ok(Some(typed))
    }

    fn serialize_array<T: Primitive>(&mut self, buf: Vec<T>, _count: usize, name: Option<&str>) -> Result<Vec<T>, SerializeError>
    {
        for (i, item) in buf.iter().enumerate() {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            self.serialize(item.clone(), item_name.as_deref())?;
        }
        Ok(buf)
    }

    fn serialize_byte_array(&mut self, buf: Vec<u8>, _count: usize, name: Option<&str>) -> Result<Vec<u8>, SerializeError>
    {
        let current_file = self.current_file;
        {
            let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
            let writer = file.create_writer(manager)?;
            writer.write_bytes(&buf)?;
        }
        self.log(&format!("{} (bytes[{}])", name.unwrap_or("<no name>"), buf.len()));
        Ok(buf)
    }

    fn serialize_object_array<T: Serializable>(
        &mut self,
        buf: Vec<Rc<RefCell<T>>>,
        _count: usize,
        name: Option<&str>,
    ) -> Result<Vec<Rc<RefCell<T>>>, SerializeError>
    {
        for (i, item) in buf.iter().enumerate() {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            self.serialize_object(item.clone(), None, item_name.as_deref())?;
        }
        Ok(buf)
    }

    fn serialize_pointer_array(
        &mut self,
        buf: Vec<Option<Pointer>>,
        _count: usize,
        anchor: Option<&Pointer>,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Vec<Option<Pointer>>, SerializeError>
    {
        for (i, item) in buf.iter().enumerate() {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            self.serialize_pointer(item.clone(), anchor, allow_invalid, item_name.as_deref())?;
        }
        Ok(buf)
    }

    fn serialize_pointer_object_array<T: Serializable>(
        &mut self,
        buf: Vec<Option<TypedPointer<T>>>,
        _count: usize,
        anchor: Option<&Pointer>,
        resolve: bool,
        allow_invalid: bool,
        name: Option<&str>,
    ) -> Result<Vec<Option<TypedPointer<T>>>, SerializeError>
    {
        let mut result = Vec::with_capacity(buf.len());
        for (i, item) in buf.into_iter().enumerate() {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            result.push(self.serialize_pointer_object(item, anchor, resolve, None, allow_invalid, item_name.as_deref())?);
        }
        Ok(result)
    }

    fn serialize_string_array(
        &mut self,
        buf: Vec<String>,
        _count: usize,
        length: Option<usize>,
        encoding: Option<&'static Encoding>,
        name: Option<&str>,
    ) -> Result<Vec<String>, SerializeError>
    {
        for (i, item) in buf.iter().enumerate() {
            let item_name = name.map(|n| format!("{n}[{i}]"));
            self.serialize_string(item, length, encoding, item_name.as_deref())?;
        }
        Ok(buf)
    }

    fn serialize_array_size<U: Primitive + TryInto<usize> + TryFrom<usize>>(&mut self, len: usize, name: Option<&str>) -> Result<usize, SerializeError>
    {
        let value = U::try_from(len).map_err(|_| SerializeError::NotSupportedType { type_name: "array length overflowed the size prefix type" })?;
        self.serialize(value, name)?;
        Ok(len)
    }

    fn serialize_bit_values<T: BitContainer>(&mut self, body: &mut dyn FnMut(&mut dyn BitAccess), name: Option<&str>) -> Result<T, SerializeError>
    {
        let mut cursor = BitCursor::for_write();
        body(&mut cursor);
        let value = T::from_bits(cursor.into_accumulator());
        self.serialize(value.clone(), name)?;
        Ok(value)
    }

    fn serialize_checksum<T: Primitive + PartialEq>(&mut self, expected: T, name: Option<&str>) -> Result<T, SerializeError>
    {
        self.serialize(expected, name)
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
            let writer = file.create_writer(manager)?;
            let previous = writer.is_little_endian;
            writer.is_little_endian = endianness.is_little();
            previous
        };

        let result = body(self);

        if let Ok(file) = self.ctx.file_mut(current_file) {
            if let Some(writer) = file.core_mut().writer.as_mut() {
                writer.is_little_endian = previous;
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
        let outer_pos = self.position()?;

        let stream_id = self.ctx.allocate_file_id();
        let stream_key = format!("__encoded_{}_{}", current_file.0, stream_id.0);
        let stream = StreamFile::new(stream_id, stream_key.clone(), Vec::new(), endianness.unwrap_or(outer_endianness), allow_local_pointers);
        self.ctx.add_file(stream_key, Box::new(stream))?;

        let inner_start = Pointer::new(0, stream_id);
        let saved_file = self.current_file;
        self.goto(&inner_start)?;

        let result = body(self);

        let scratch_bytes = {
            let (file, manager) = self.ctx.file_mut_and_manager(stream_id)?;
            file.end_write(manager)?;
            file.snapshot_bytes().expect("do_encoded always registers a StreamFile")
        };

        let _ = self.ctx.remove_file(stream_id);
        self.current_file = saved_file;
        self.seek_current(outer_pos)?;

        let encoded = encoder.encode(&scratch_bytes)?;
        {
            let (file, manager) = self.ctx.file_mut_and_manager(current_file)?;
            let writer = file.create_writer(manager)?;
            writer.write_bytes(&encoded)?;
        }

        result
    }

    fn begin_xor(&mut self, filter: Box<dyn XorCalculator>)
    {
        let current_file = self.current_file;
        if let Ok(file) = self.ctx.file_mut(current_file) {
            if let Some(writer) = file.core_mut().writer.as_mut() {
                let previous = writer.begin_xor(filter);
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
            if let Some(writer) = file.core_mut().writer.as_mut() {
                writer.end_xor(previous);
            }
        }
    }

    fn begin_calculate_checksum(&mut self, calculator: Box<dyn ChecksumCalculator>)
    {
        let current_file = self.current_file;
        if let Ok(file) = self.ctx.file_mut(current_file) {
            if let Some(writer) = file.core_mut().writer.as_mut() {
                let previous = writer.begin_checksum(calculator);
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
            if let Some(writer) = file.core_mut().writer.as_mut() {
                return writer.end_checksum(previous);
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
            self.ctx.log(false, &pointer, self.depth, message);
        }
    }
}
