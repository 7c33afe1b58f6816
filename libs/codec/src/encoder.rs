//! # Wire Encoders
//!
//! [`Encoder`] is the primitive-level sink the message protocol writes into.
//! Two sinks implement it:
//!
//! - [`Serializer`] appends bytes to a [`Buffer`] at its cursor
//! - [`SizeCounter`] only counts, so length prefixes can be computed with the
//!   exact same code path that later writes the payload
//!
//! ## Wire Format
//!
//! | Value | Encoding |
//! |-------|----------|
//! | unsigned integer | LEB128 varint |
//! | signed integer | zigzag, then LEB128 |
//! | `bool` | varint 0 or 1 |
//! | `f32` / `f64` | 4 / 8 bytes, big-endian bit pattern |
//! | string | `varint(byte_len)` + UTF-8 |
//! | byte array | `varint(len)` + bytes |
//! | fingerprint | `varint(bit_len)` + `ceil(bit_len / 8)` bytes |
//! | nested message | `varint(payload_len)` + payload, 0 = absent |
//! | top-level frame | `varint(type_id)` + full payload |

use crate::buffer::Buffer;
use crate::cell::{write_nested, Cell};
use crate::error::CodecResult;
use crate::varint::{self, zigzag32, zigzag64, MAX_VARINT_LEN};
use types::{Fingerprint, TypeTag};

/// Primitive-level byte sink
pub trait Encoder {
    fn write_raw(&mut self, bytes: &[u8]) -> CodecResult<()>;

    fn write_byte(&mut self, byte: u8) -> CodecResult<()>;

    fn write_varint(&mut self, value: u64) -> CodecResult<()> {
        let mut out = [0u8; MAX_VARINT_LEN];
        let len = varint::encode(value, &mut out);
        self.write_raw(&out[..len])
    }

    fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.write_varint(u64::from(value))
    }

    fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.write_varint(u64::from(value))
    }

    fn write_u16(&mut self, value: u16) -> CodecResult<()> {
        self.write_varint(u64::from(value))
    }

    fn write_u32(&mut self, value: u32) -> CodecResult<()> {
        self.write_varint(u64::from(value))
    }

    fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.write_varint(value)
    }

    fn write_usize(&mut self, value: usize) -> CodecResult<()> {
        self.write_varint(value as u64)
    }

    fn write_i8(&mut self, value: i8) -> CodecResult<()> {
        self.write_i32(i32::from(value))
    }

    fn write_i16(&mut self, value: i16) -> CodecResult<()> {
        self.write_i32(i32::from(value))
    }

    fn write_i32(&mut self, value: i32) -> CodecResult<()> {
        self.write_varint(u64::from(zigzag32(value)))
    }

    fn write_i64(&mut self, value: i64) -> CodecResult<()> {
        self.write_varint(zigzag64(value))
    }

    fn write_f32(&mut self, value: f32) -> CodecResult<()> {
        self.write_raw(&value.to_bits().to_be_bytes())
    }

    fn write_f64(&mut self, value: f64) -> CodecResult<()> {
        self.write_raw(&value.to_bits().to_be_bytes())
    }

    fn write_str(&mut self, value: &str) -> CodecResult<()> {
        self.write_bytes(value.as_bytes())
    }

    fn write_bytes(&mut self, value: &[u8]) -> CodecResult<()> {
        self.write_usize(value.len())?;
        self.write_raw(value)
    }

    /// Fingerprint image cut or zero-extended to `bit_len` bits
    fn write_fingerprint(&mut self, fingerprint: &Fingerprint, bit_len: usize) -> CodecResult<()> {
        self.write_usize(bit_len)?;
        for byte in fingerprint.wire_bytes(bit_len) {
            self.write_byte(byte)?;
        }
        Ok(())
    }
}

/// Encoder appending to a [`Buffer`] at its cursor
pub struct Serializer<'a> {
    buffer: &'a mut Buffer,
}

impl<'a> Serializer<'a> {
    pub fn new(buffer: &'a mut Buffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&mut self) -> &mut Buffer {
        self.buffer
    }

    /// `varint(type_id)` followed by the full, unsliced payload.
    /// Returns the number of bytes written.
    pub fn write_frame(&mut self, message: &dyn Cell) -> CodecResult<usize> {
        self.write_frame_as(message, message.type_tag())
    }

    /// Frame for `message` viewed as its ancestor `as_type`.
    ///
    /// On failure the buffer is put back as it was: the cursor returns to
    /// where the frame started and any bytes appended past the old end are
    /// cut, so a starved caller can retry the same frame later.
    pub fn write_frame_as(&mut self, message: &dyn Cell, as_type: &TypeTag) -> CodecResult<usize> {
        message.type_tag().ensure_ancestor(as_type)?;
        let start = self.buffer.position();
        let len = self.buffer.len();
        let mut written = self.write_u32(as_type.id());
        if written.is_ok() {
            written = message.encode_fields(self, as_type).map(|_| ());
        }
        if let Err(err) = written {
            self.buffer.truncate(len);
            self.buffer.set_position(start)?;
            return Err(err);
        }
        Ok(self.buffer.position() - start)
    }

    /// Length-prefixed nested message, sliced to `as_type`
    pub fn write_message(&mut self, message: Option<&dyn Cell>, as_type: &TypeTag) -> CodecResult<()> {
        write_nested(self, message, as_type)
    }
}

impl Encoder for Serializer<'_> {
    #[inline]
    fn write_raw(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.buffer.write(bytes)
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) -> CodecResult<()> {
        self.buffer.put_byte(byte)
    }
}

/// Encoder that only measures
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeCounter {
    len: usize,
}

impl SizeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Encoder for SizeCounter {
    #[inline]
    fn write_raw(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.len += bytes.len();
        Ok(())
    }

    #[inline]
    fn write_byte(&mut self, _byte: u8) -> CodecResult<()> {
        self.len += 1;
        Ok(())
    }

    #[inline]
    fn write_varint(&mut self, value: u64) -> CodecResult<()> {
        self.len += varint::encoded_len(value);
        Ok(())
    }

    fn write_fingerprint(&mut self, _fingerprint: &Fingerprint, bit_len: usize) -> CodecResult<()> {
        self.len += varint::encoded_len(bit_len as u64) + bit_len.div_ceil(8);
        Ok(())
    }
}
