//! Top-level frames
//!
//! What a link writes per message: `varint(type_id)` then the payload. The
//! transport's own length/transform header goes around this and is not the
//! codec's business.

use crate::buffer::Buffer;
use crate::cell::{Cell, CellExt};
use crate::deserializer::Deserializer;
use crate::encoder::Serializer;
use crate::error::CodecResult;
use crate::registry::TypeRegistry;
use crate::varint;
use types::TypeTag;

/// Write `message` with its full chain at the buffer cursor.
/// Returns the frame length.
pub fn serialize(message: &dyn Cell, buffer: &mut Buffer) -> CodecResult<usize> {
    Serializer::new(buffer).write_frame(message)
}

/// Write `message` as its ancestor `as_type`: the frame carries that type's
/// id and none of the more-derived fields
pub fn serialize_as(message: &dyn Cell, as_type: &TypeTag, buffer: &mut Buffer) -> CodecResult<usize> {
    Serializer::new(buffer).write_frame_as(message, as_type)
}

/// Read one frame at the buffer cursor, resolving its type id through
/// `registry` and then the global registry.
///
/// On failure the cursor is put back where the frame started, so after an
/// underrun the caller can simply wait for more bytes and retry.
pub fn deserialize(buffer: &mut Buffer, registry: &TypeRegistry) -> CodecResult<Box<dyn Cell>> {
    let start = buffer.position();
    let result = Deserializer::with_registry(buffer, registry).read_frame();
    if result.is_err() {
        buffer.set_position(start)?;
    }
    result
}

/// Length of the frame [`serialize`] would write
pub fn encoded_length(message: &dyn Cell) -> usize {
    varint::encoded_len(u64::from(message.type_tag().id())) + message.encoded_len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    #[test]
    fn test_frame_layout() {
        let event = Event::new().with_handle(300);
        let mut buffer = Buffer::new();
        let written = serialize(&event, &mut buffer).unwrap();

        // type id, fingerprint (4 bits, 1 byte), handle
        assert_eq!(buffer.to_vec(), vec![0x01, 0x04, 0b0001, 0xAC, 0x02]);
        assert_eq!(written, 5);
        assert_eq!(encoded_length(&event), written);
    }

    #[test]
    fn test_underrun_restores_cursor() {
        let event = Event::new().with_channel("partial".into());
        let mut buffer = Buffer::new();
        serialize(&event, &mut buffer).unwrap();
        let full = buffer.to_vec();

        let mut partial = Buffer::from_slice(&full[..full.len() - 3]).unwrap();
        let err = deserialize(&mut partial, &TypeRegistry::new()).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(partial.position(), 0);

        partial.set_position(partial.len()).unwrap();
        partial.write(&full[full.len() - 3..]).unwrap();
        partial.rewind();
        let decoded = deserialize(&mut partial, &TypeRegistry::new()).unwrap();
        assert_eq!(decoded.downcast_ref::<Event>(), Some(&event));
    }
}
