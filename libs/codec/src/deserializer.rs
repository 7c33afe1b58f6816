//! Decoder side of the wire format
//!
//! A [`Deserializer`] reads primitives at a [`Buffer`]'s cursor and drives
//! the per-level decode chain of messages. Nested payloads are fenced with
//! the buffer marker so a level can never read into its sibling's bytes, and
//! once a nested payload is decoded the cursor jumps to the end of its length
//! prefix: trailing bytes written by a newer peer are skipped.

use crate::buffer::Buffer;
use crate::cell::{Cell, Message};
use crate::error::{CodecError, CodecResult};
use crate::registry::TypeRegistry;
use crate::varint::{self, unzigzag32, unzigzag64};
use tracing::debug;
use types::Fingerprint;

/// Reads wire values from a [`Buffer`]
pub struct Deserializer<'a> {
    buffer: &'a mut Buffer,
    registry: Option<&'a TypeRegistry>,
}

impl<'a> Deserializer<'a> {
    /// Resolves dynamic type ids through the global registry only
    pub fn new(buffer: &'a mut Buffer) -> Self {
        Self {
            buffer,
            registry: None,
        }
    }

    /// Resolves dynamic type ids through `registry` first, then the global one
    pub fn with_registry(buffer: &'a mut Buffer, registry: &'a TypeRegistry) -> Self {
        Self {
            buffer,
            registry: Some(registry),
        }
    }

    pub fn buffer(&mut self) -> &mut Buffer {
        self.buffer
    }

    pub fn read_varint(&mut self) -> CodecResult<u64> {
        let buffer = &mut *self.buffer;
        varint::decode(|| buffer.get_byte())
    }

    pub fn read_bool(&mut self) -> CodecResult<bool> {
        match self.read_varint()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::overflow("bool")),
        }
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        u8::try_from(self.read_varint()?).map_err(|_| CodecError::overflow("u8"))
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        u16::try_from(self.read_varint()?).map_err(|_| CodecError::overflow("u16"))
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        u32::try_from(self.read_varint()?).map_err(|_| CodecError::overflow("u32"))
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        self.read_varint()
    }

    pub fn read_usize(&mut self) -> CodecResult<usize> {
        usize::try_from(self.read_varint()?).map_err(|_| CodecError::overflow("usize"))
    }

    pub fn read_i8(&mut self) -> CodecResult<i8> {
        i8::try_from(self.read_i32()?).map_err(|_| CodecError::overflow("i8"))
    }

    pub fn read_i16(&mut self) -> CodecResult<i16> {
        i16::try_from(self.read_i32()?).map_err(|_| CodecError::overflow("i16"))
    }

    pub fn read_i32(&mut self) -> CodecResult<i32> {
        let raw = u32::try_from(self.read_varint()?).map_err(|_| CodecError::overflow("i32"))?;
        Ok(unzigzag32(raw))
    }

    pub fn read_i64(&mut self) -> CodecResult<i64> {
        Ok(unzigzag64(self.read_varint()?))
    }

    pub fn read_f32(&mut self) -> CodecResult<f32> {
        let mut raw = [0u8; 4];
        self.buffer.read(&mut raw)?;
        Ok(f32::from_bits(u32::from_be_bytes(raw)))
    }

    pub fn read_f64(&mut self) -> CodecResult<f64> {
        let mut raw = [0u8; 8];
        self.buffer.read(&mut raw)?;
        Ok(f64::from_bits(u64::from_be_bytes(raw)))
    }

    pub fn read_bytes(&mut self) -> CodecResult<Vec<u8>> {
        let len = self.read_usize()?;
        self.buffer.read_vec(len)
    }

    pub fn read_string(&mut self) -> CodecResult<String> {
        let bytes = self.read_bytes()?;
        let len = bytes.len();
        String::from_utf8(bytes).map_err(|err| CodecError::MalformedUtf8 {
            offset: err.utf8_error().valid_up_to(),
            len,
        })
    }

    /// Replace the bits of `fingerprint` with the wire image, zero-extending
    /// or truncating to its own length
    pub fn read_fingerprint_into(&mut self, fingerprint: &mut Fingerprint) -> CodecResult<()> {
        let bit_len = self.read_usize()?;
        let bytes = self.buffer.read_vec(bit_len.div_ceil(8))?;
        fingerprint.load_bytes(&bytes);
        Ok(())
    }

    /// Length-prefixed nested message of a statically known type
    pub fn read_message<T: Message>(&mut self) -> CodecResult<Option<Box<T>>> {
        let len = self.read_usize()?;
        if len == 0 {
            return Ok(None);
        }
        self.fenced(len, |de| {
            let mut message = T::default();
            message.decode_fields(de)?;
            Ok(Some(Box::new(message)))
        })
    }

    /// Length-prefixed nested message whose payload opens with its type id
    pub fn read_dynamic(&mut self) -> CodecResult<Option<Box<dyn Cell>>> {
        let len = self.read_usize()?;
        if len == 0 {
            return Ok(None);
        }
        self.fenced(len, |de| {
            let type_id = de.read_u32()?;
            let mut message = de.create(type_id)?;
            message.decode_fields(de)?;
            Ok(Some(message))
        })
    }

    /// One top-level frame: `varint(type_id)` + full payload
    pub fn read_frame(&mut self) -> CodecResult<Box<dyn Cell>> {
        let type_id = self.read_u32()?;
        let mut message = self.create(type_id)?;
        message.decode_fields(self)?;
        Ok(message)
    }

    /// Fresh instance for `type_id`: local registry first, then global
    pub fn create(&self, type_id: u32) -> CodecResult<Box<dyn Cell>> {
        self.registry
            .and_then(|registry| registry.create(type_id))
            .or_else(|| TypeRegistry::global().create(type_id))
            .ok_or_else(|| {
                debug!(type_id, "No constructor registered for type id");
                CodecError::UnknownType { type_id }
            })
    }

    /// Run `decode` with reads bounded to the next `len` bytes, then put the
    /// cursor at the end of that range whatever `decode` consumed
    fn fenced<T>(
        &mut self,
        len: usize,
        decode: impl FnOnce(&mut Self) -> CodecResult<T>,
    ) -> CodecResult<T> {
        self.buffer.check_length_to_read(len)?;
        let start = self.buffer.position();
        let end = start + len;
        let saved = self.buffer.marker();
        self.buffer.set_marker(end)?;

        let result = decode(self);

        let consumed = self.buffer.position() - start;
        match saved {
            Some(marker) => self.buffer.set_marker(marker)?,
            None => self.buffer.clear_marker(),
        }

        match result {
            // The bytes were all there, so running out inside the fence
            // means the payload disagrees with its own prefix
            Err(CodecError::EndOfStream { .. }) => Err(CodecError::NestedOverrun {
                declared: len,
                consumed,
            }),
            Err(err) => Err(err),
            Ok(value) => {
                self.buffer.set_position(end)?;
                Ok(value)
            }
        }
    }
}
