//! # Message Base Protocol
//!
//! Every message type implements [`Cell`] one level at a time: a level acts
//! on the fields it declares and delegates everything else to its base. Each
//! operation tests the field's fingerprint bit first, so untouched fields are
//! skipped by equality, hashing, encoding and description alike.
//!
//! ```text
//! LimitOrder::encode_fields(target = Order)
//!   └─ Order::encode_fields       → fields 4..7, keep going? no (target reached)
//!        └─ Event::encode_fields  → fingerprint + fields 0..4, keep going? yes
//!   LimitOrder stops: its fields are not written
//! ```
//!
//! Types are normally declared with [`message!`](crate::message), which
//! generates the whole chain; implementing [`Cell`] by hand is possible but
//! rarely useful.

use crate::deserializer::Deserializer;
use crate::encoder::{Encoder, SizeCounter};
use crate::error::CodecResult;
use crate::varint;
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hasher;
use types::{Fingerprint, TypeTag};

/// One level of a message type chain
pub trait Cell: Any + fmt::Debug + Send + Sync {
    /// Tag of the most-derived type
    fn type_tag(&self) -> &'static TypeTag;

    fn fingerprint(&self) -> &Fingerprint;

    fn fingerprint_mut(&mut self) -> &mut Fingerprint;

    /// The level of this value declared by `tag`, for downcasting the
    /// other side of a comparison
    fn level(&self, tag: &TypeTag) -> Option<&dyn Any>;

    /// Compare the fields whose bit is set in `mask`, level by level.
    /// `other` must carry every level of this chain.
    fn eq_fields(&self, other: &dyn Cell, mask: &Fingerprint) -> bool;

    /// Feed the fields whose bit is set in `mask`
    fn hash_fields(&self, mask: &Fingerprint, state: &mut dyn Hasher);

    /// Write the fingerprint (cut to `target`'s field count) and the touched
    /// fields of every level up to and including `target`. Returns whether
    /// more-derived levels should keep writing.
    fn encode_fields(&self, enc: &mut dyn Encoder, target: &TypeTag) -> CodecResult<bool>;

    fn decode_fields(&mut self, de: &mut Deserializer<'_>) -> CodecResult<()>;

    fn describe_fields(&self, out: &mut Description);

    fn clone_cell(&self) -> Box<dyn Cell>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

/// Statically typed message: known tag and a default constructor
pub trait Message: Cell + Default + Clone {
    const TAG: &'static TypeTag;
}

impl Clone for Box<dyn Cell> {
    fn clone(&self) -> Self {
        self.clone_cell()
    }
}

impl dyn Cell {
    pub fn is<T: Cell>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Cell>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Cell>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Unbox into the concrete type, `None` if it is something else
    pub fn downcast<T: Cell>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}

impl PartialEq for dyn Cell {
    fn eq(&self, other: &dyn Cell) -> bool {
        self.structural_eq(other)
    }
}

/// Derived operations available on every [`Cell`]
pub trait CellExt: Cell {
    /// Same runtime type, same touched set, equal touched values
    fn structural_eq(&self, other: &dyn Cell) -> bool {
        self.type_tag().id() == other.type_tag().id()
            && self.fingerprint() == other.fingerprint()
            && self.eq_fields(other, self.fingerprint())
    }

    /// `self` used as a pattern: every field touched here is touched in
    /// `other` with the same value, and `other` is of this type or derives
    /// from it
    fn equivalent(&self, other: &dyn Cell) -> bool {
        self.equivalent_under(other, self.fingerprint())
    }

    /// Like [`CellExt::equivalent`] with an explicit pattern in place of this
    /// value's own fingerprint
    fn equivalent_under(&self, other: &dyn Cell, mask: &Fingerprint) -> bool {
        other.type_tag().is_a(self.type_tag())
            && mask.equivalent(other.fingerprint())
            && self.eq_fields(other, mask)
    }

    /// Hash of the fields selected by `mask`. A derived value and its base
    /// hash alike under a base-level mask.
    fn value_hash(&self, mask: &Fingerprint) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_fields(mask, &mut hasher);
        hasher.finish()
    }

    fn describe(&self) -> String {
        let mut out = Description::new(self.type_tag().name());
        self.describe_fields(&mut out);
        out.to_string()
    }

    /// Payload length, full chain
    fn encoded_len(&self) -> usize {
        // Counting never fails and the full chain is always a valid target
        self.encoded_len_as(self.type_tag()).unwrap_or_default()
    }

    /// Payload length when sliced to `as_type`
    fn encoded_len_as(&self, as_type: &TypeTag) -> CodecResult<usize> {
        self.type_tag().ensure_ancestor(as_type)?;
        let mut counter = SizeCounter::new();
        self.encode_fields(&mut counter, as_type)?;
        Ok(counter.len())
    }

    fn is_a(&self, tag: &TypeTag) -> bool {
        self.type_tag().is_a(tag)
    }
}

impl<T: Cell + ?Sized> CellExt for T {}

/// `varint(len)` + payload sliced to `as_type`; `None` writes length 0
pub fn write_nested(
    enc: &mut dyn Encoder,
    message: Option<&dyn Cell>,
    as_type: &TypeTag,
) -> CodecResult<()> {
    let Some(message) = message else {
        return enc.write_usize(0);
    };
    let len = message.encoded_len_as(as_type)?;
    enc.write_usize(len)?;
    message.encode_fields(enc, as_type)?;
    Ok(())
}

/// `varint(len)` + `varint(type_id)` + full payload; `None` writes length 0
pub fn write_dynamic(enc: &mut dyn Encoder, message: Option<&dyn Cell>) -> CodecResult<()> {
    let Some(message) = message else {
        return enc.write_usize(0);
    };
    let tag = message.type_tag();
    let len = varint::encoded_len(u64::from(tag.id())) + message.encoded_len_as(tag)?;
    enc.write_usize(len)?;
    enc.write_u32(tag.id())?;
    message.encode_fields(enc, tag)?;
    Ok(())
}

/// Human-readable rendering of the touched fields of a message
#[derive(Debug, Clone)]
pub struct Description {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
}

impl Description {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    pub fn field(&mut self, name: &'static str, value: &dyn fmt::Debug) {
        self.fields.push((name, format!("{value:?}")));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.name)?;
        for (index, (name, value)) in self.fields.iter().enumerate() {
            let sep = if index == 0 { " " } else { ", " };
            write!(f, "{sep}{name}: {value}")?;
        }
        if self.fields.is_empty() {
            write!(f, "}}")
        } else {
            write!(f, " }}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_format() {
        let mut out = Description::new("Quote");
        assert_eq!(out.to_string(), "Quote {}");
        out.field("bid", &101);
        out.field("venue", &"XNAS");
        assert_eq!(out.to_string(), "Quote { bid: 101, venue: \"XNAS\" }");
        assert_eq!(out.len(), 2);
    }
}
