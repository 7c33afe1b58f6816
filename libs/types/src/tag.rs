//! # Type-Tag Chains
//!
//! Every concrete message type owns one immutable [`TypeTag`] describing its
//! position in a single-inheritance lattice: the numeric runtime type id, a
//! link to the base type's tag, the number of fields declared at this level,
//! and the cumulative field offset of those fields.
//!
//! ```text
//! Event (offset 0, own 4) ← Order (offset 4, own 3) ← LimitOrder (offset 7, own 1)
//!                                                     field bit = offset + index
//! ```
//!
//! Tags are `const`-constructed, so the whole lattice is read-only program data
//! and may be shared between threads without synchronisation. Identity is the
//! numeric id, never the address.

use crate::errors::TagError;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Static descriptor of one message type level
#[derive(Debug)]
pub struct TypeTag {
    id: u32,
    name: &'static str,
    base: Option<&'static TypeTag>,
    own_fields: usize,
    offset: usize,
    depth: usize,
}

impl TypeTag {
    /// Descriptor of a type with no base
    pub const fn root(id: u32, name: &'static str, own_fields: usize) -> Self {
        Self {
            id,
            name,
            base: None,
            own_fields,
            offset: 0,
            depth: 0,
        }
    }

    /// Descriptor of a type extending `base`; its fields start right after
    /// the last field of the base chain.
    pub const fn derived(
        id: u32,
        name: &'static str,
        base: &'static TypeTag,
        own_fields: usize,
    ) -> Self {
        Self {
            id,
            name,
            base: Some(base),
            own_fields,
            offset: base.offset + base.own_fields,
            depth: base.depth + 1,
        }
    }

    #[inline]
    pub const fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub const fn base(&self) -> Option<&'static TypeTag> {
        self.base
    }

    /// Fields declared at this level only
    #[inline]
    pub const fn own_field_count(&self) -> usize {
        self.own_fields
    }

    /// Absolute bit position of this level's first field
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Distance from the root (0 for a root type)
    #[inline]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Fingerprint length of an instance of this type: all fields of the chain
    #[inline]
    pub const fn field_count(&self) -> usize {
        self.offset + self.own_fields
    }

    /// Walk from this type toward the root, this type first
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// True when `ancestor` is this type or one of its bases
    pub fn is_a(&self, ancestor: &TypeTag) -> bool {
        self.chain().any(|tag| tag.id == ancestor.id)
    }

    /// The level of this chain carrying `id`, if any
    pub fn find(&self, id: u32) -> Option<&TypeTag> {
        self.chain().find(|tag| tag.id == id)
    }

    pub fn ensure_ancestor(&self, ancestor: &TypeTag) -> Result<(), TagError> {
        if self.is_a(ancestor) {
            Ok(())
        } else {
            Err(TagError::NotAnAncestor {
                actual: self.name,
                actual_id: self.id,
                target: ancestor.name,
                target_id: ancestor.id,
            })
        }
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Iterator over a tag chain, most-derived first
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a TypeTag>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a TypeTag;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.base.map(|base| base as &'a TypeTag);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &TypeTag = &TypeTag::root(1, "Root", 4);
    const MID: &TypeTag = &TypeTag::derived(2, "Mid", ROOT, 3);
    const LEAF: &TypeTag = &TypeTag::derived(3, "Leaf", MID, 1);
    const OTHER: &TypeTag = &TypeTag::root(9, "Other", 2);

    #[test]
    fn test_offsets_accumulate() {
        assert_eq!(ROOT.offset(), 0);
        assert_eq!(MID.offset(), 4);
        assert_eq!(LEAF.offset(), 7);
        assert_eq!(LEAF.field_count(), 8);
        assert_eq!(LEAF.depth(), 2);
    }

    #[test]
    fn test_chain_walks_toward_root() {
        let ids: Vec<u32> = LEAF.chain().map(TypeTag::id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(ROOT.chain().count(), 1);
    }

    #[test]
    fn test_ancestry() {
        assert!(LEAF.is_a(ROOT));
        assert!(LEAF.is_a(LEAF));
        assert!(!ROOT.is_a(LEAF));
        assert!(LEAF.ensure_ancestor(OTHER).is_err());
        assert_eq!(LEAF.find(2).map(TypeTag::name), Some("Mid"));
        assert!(LEAF.find(9).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(MID.to_string(), "Mid#2");
    }
}
