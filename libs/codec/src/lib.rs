//! # Wirebus Codec
//!
//! ## Purpose
//!
//! Binary wire codec and message protocol of the bus:
//! - Pooled segmented [`Buffer`] with cursor, marker and adaptive room factor
//! - Zigzag + LEB128 varints, big-endian floats, length-prefixed UTF-8
//! - Chained per-level [`Cell`] protocol encoding only touched fields
//! - Type-sliced encoding of a subtype as one of its ancestors
//! - Type id → constructor [`TypeRegistry`] for decoding dynamic payloads
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → messaging/binder
//!     ↑           ↓              ↓
//! Fingerprint  Wire format    Dispatch
//! TypeTag      Buffer/pool    Handler chains
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use codec::{Buffer, CellExt, TypeRegistry};
//!
//! codec::message! {
//!     pub struct Tick: 2001 {
//!         price: i64,
//!         symbol: String,
//!     }
//! }
//!
//! let registry = TypeRegistry::new();
//! registry.register::<Tick>().unwrap();
//!
//! let tick = Tick::new().with_price(-15);
//! let mut buffer = Buffer::new();
//! codec::serialize(&tick, &mut buffer).unwrap();
//!
//! buffer.rewind();
//! let decoded = codec::deserialize(&mut buffer, &registry).unwrap();
//! let decoded = decoded.downcast::<Tick>().unwrap();
//! assert_eq!(*decoded.price(), -15);
//! assert!(!decoded.has_symbol());
//! assert!(decoded.structural_eq(&tick));
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Dispatch of messages to handlers (belongs in messaging/binder)
//! - Transport links, framing headers or socket handling

pub mod buffer;
pub mod cell;
pub mod deserializer;
pub mod encoder;
pub mod error;
pub mod event;
pub mod field;
pub mod frame;
pub mod macros;
pub mod pool;
pub mod registry;
pub mod varint;

pub use buffer::Buffer;
pub use cell::{write_dynamic, write_nested, Cell, CellExt, Description, Message};
pub use deserializer::Deserializer;
pub use encoder::{Encoder, Serializer, SizeCounter};
pub use error::{CodecError, CodecResult, ErrorKind};
pub use event::Event;
pub use field::Field;
pub use frame::{deserialize, encoded_length, serialize, serialize_as};
pub use pool::{PoolStats, Segment, SegmentPool};
pub use registry::{Constructor, TypeRegistry};

// Re-exported for `message!` expansions in downstream crates
#[doc(hidden)]
pub use paste;
pub use types;
