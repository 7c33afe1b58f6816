//! Value types usable as message fields
//!
//! A [`Field`] knows its own wire encoding plus the equality and hash used
//! for dispatch matching. Floats compare and hash by bit pattern so the two
//! stay consistent (`NaN` matches `NaN`, `0.0` does not match `-0.0`).
//! Nested messages are boxed and optional; `None` travels as length 0.

use crate::cell::{write_dynamic, write_nested, Cell, CellExt, Message};
use crate::deserializer::Deserializer;
use crate::encoder::Encoder;
use crate::error::CodecResult;
use std::fmt;
use std::hash::{Hash, Hasher};

pub trait Field: Clone + Default + fmt::Debug + Send + Sync + 'static {
    fn encode(&self, enc: &mut dyn Encoder) -> CodecResult<()>;

    fn decode(de: &mut Deserializer<'_>) -> CodecResult<Self>;

    fn field_eq(&self, other: &Self) -> bool;

    fn field_hash(&self, state: &mut dyn Hasher);
}

macro_rules! impl_field {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Field for $ty {
                #[inline]
                fn encode(&self, enc: &mut dyn Encoder) -> CodecResult<()> {
                    enc.$write(*self)
                }

                #[inline]
                fn decode(de: &mut Deserializer<'_>) -> CodecResult<Self> {
                    de.$read()
                }

                #[inline]
                fn field_eq(&self, other: &Self) -> bool {
                    self == other
                }

                fn field_hash(&self, mut state: &mut dyn Hasher) {
                    self.hash(&mut state);
                }
            }
        )*
    };
}

impl_field! {
    bool => write_bool, read_bool;
    u8 => write_u8, read_u8;
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
    i8 => write_i8, read_i8;
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
}

macro_rules! impl_float_field {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Field for $ty {
                #[inline]
                fn encode(&self, enc: &mut dyn Encoder) -> CodecResult<()> {
                    enc.$write(*self)
                }

                #[inline]
                fn decode(de: &mut Deserializer<'_>) -> CodecResult<Self> {
                    de.$read()
                }

                #[inline]
                fn field_eq(&self, other: &Self) -> bool {
                    self.to_bits() == other.to_bits()
                }

                fn field_hash(&self, mut state: &mut dyn Hasher) {
                    self.to_bits().hash(&mut state);
                }
            }
        )*
    };
}

impl_float_field! {
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

impl Field for String {
    fn encode(&self, enc: &mut dyn Encoder) -> CodecResult<()> {
        enc.write_str(self)
    }

    fn decode(de: &mut Deserializer<'_>) -> CodecResult<Self> {
        de.read_string()
    }

    fn field_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn field_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }
}

impl Field for Vec<u8> {
    fn encode(&self, enc: &mut dyn Encoder) -> CodecResult<()> {
        enc.write_bytes(self)
    }

    fn decode(de: &mut Deserializer<'_>) -> CodecResult<Self> {
        de.read_bytes()
    }

    fn field_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn field_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }
}

fn nested_eq(a: Option<&dyn Cell>, b: Option<&dyn Cell>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.structural_eq(b),
        _ => false,
    }
}

fn nested_hash(value: Option<&dyn Cell>, mut state: &mut dyn Hasher) {
    match value {
        None => 0u64.hash(&mut state),
        Some(inner) => inner.value_hash(inner.fingerprint()).hash(&mut state),
    }
}

/// Nested message of a known type, sliced to that type on the wire
impl<T: Message> Field for Option<Box<T>> {
    fn encode(&self, enc: &mut dyn Encoder) -> CodecResult<()> {
        write_nested(enc, self.as_deref().map(|inner| inner as &dyn Cell), T::TAG)
    }

    fn decode(de: &mut Deserializer<'_>) -> CodecResult<Self> {
        de.read_message::<T>()
    }

    fn field_eq(&self, other: &Self) -> bool {
        nested_eq(
            self.as_deref().map(|inner| inner as &dyn Cell),
            other.as_deref().map(|inner| inner as &dyn Cell),
        )
    }

    fn field_hash(&self, state: &mut dyn Hasher) {
        nested_hash(self.as_deref().map(|inner| inner as &dyn Cell), state);
    }
}

/// Nested message of any registered type, resolved by type id on decode
impl Field for Option<Box<dyn Cell>> {
    fn encode(&self, enc: &mut dyn Encoder) -> CodecResult<()> {
        write_dynamic(enc, self.as_deref())
    }

    fn decode(de: &mut Deserializer<'_>) -> CodecResult<Self> {
        de.read_dynamic()
    }

    fn field_eq(&self, other: &Self) -> bool {
        nested_eq(self.as_deref(), other.as_deref())
    }

    fn field_hash(&self, state: &mut dyn Hasher) {
        nested_hash(self.as_deref(), state);
    }
}
