//! # Field-Presence Fingerprints
//!
//! ## Purpose
//!
//! A [`Fingerprint`] is a fixed-length bit vector recording which fields of a
//! message instance were explicitly assigned. Bit `offset + index` belongs to
//! field `index` declared at the level whose [`TypeTag`](crate::TypeTag) has
//! that `offset`, so a single fingerprint covers a whole inheritance chain.
//!
//! The same bitset drives two things:
//! - **Dispatch**: a registered pattern matches a message when the pattern's
//!   set bits are a subset of the message's set bits ([`Fingerprint::equivalent`]).
//! - **Wire encoding**: only touched fields are written, and the fingerprint
//!   itself travels in front of them so the reader knows which follow.
//!
//! ## Layout
//!
//! The first 32 bits live inline; longer fingerprints spill into a boxed tail
//! of 32-bit blocks. Bits at or beyond `len` are always zero, which keeps the
//! derived `Eq`/`Hash` canonical.

use crate::errors::FingerprintError;
use std::cmp::Ordering;
use std::fmt;

const BLOCK_BITS: usize = 32;

/// Fixed-length record of touched fields
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    len: usize,
    head: u32,
    tail: Box<[u32]>,
}

impl Fingerprint {
    /// Create an all-clear fingerprint covering `len` fields
    pub fn new(len: usize) -> Self {
        let blocks = len.div_ceil(BLOCK_BITS);
        Self {
            len,
            head: 0,
            tail: vec![0u32; blocks.saturating_sub(1)].into_boxed_slice(),
        }
    }

    /// Number of fields covered
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the fingerprint covers no fields at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when no bit is set
    pub fn is_clear(&self) -> bool {
        self.head == 0 && self.tail.iter().all(|block| *block == 0)
    }

    /// Number of touched fields
    pub fn count(&self) -> usize {
        self.head.count_ones() as usize
            + self
                .tail
                .iter()
                .map(|block| block.count_ones() as usize)
                .sum::<usize>()
    }

    /// Mark field `index` as assigned
    pub fn touch(&mut self, index: usize) -> Result<(), FingerprintError> {
        self.check(index)?;
        *self.block_mut(index / BLOCK_BITS) |= 1 << (index % BLOCK_BITS);
        Ok(())
    }

    /// Mark field `index` as never assigned
    pub fn wipe(&mut self, index: usize) -> Result<(), FingerprintError> {
        self.check(index)?;
        *self.block_mut(index / BLOCK_BITS) &= !(1 << (index % BLOCK_BITS));
        Ok(())
    }

    /// Read bit `index`
    pub fn get(&self, index: usize) -> Result<bool, FingerprintError> {
        self.check(index)?;
        Ok(self.bit(index))
    }

    /// Read bit `index`, treating indices past the end as clear
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < self.len && self.bit(index)
    }

    /// Set bit `index`, panicking when it is out of range.
    ///
    /// Used by generated accessors whose indices are valid by construction.
    #[track_caller]
    pub fn set_bit(&mut self, index: usize) {
        assert!(
            index < self.len,
            "fingerprint index {index} out of range (length {})",
            self.len
        );
        *self.block_mut(index / BLOCK_BITS) |= 1 << (index % BLOCK_BITS);
    }

    /// Clear bit `index`, panicking when it is out of range.
    #[track_caller]
    pub fn clear_bit(&mut self, index: usize) {
        assert!(
            index < self.len,
            "fingerprint index {index} out of range (length {})",
            self.len
        );
        *self.block_mut(index / BLOCK_BITS) &= !(1 << (index % BLOCK_BITS));
    }

    /// Clear every bit, keeping the length
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail.iter_mut().for_each(|block| *block = 0);
    }

    /// Subset test: every bit set here is also set in `other`.
    ///
    /// Not symmetric. A pattern with fewer bits is equivalent to (covered by)
    /// a message with more, never the other way round. A longer fingerprint
    /// is never equivalent to a shorter one.
    pub fn equivalent(&self, other: &Fingerprint) -> bool {
        if self.len > other.len {
            return false;
        }
        (0..self.block_count()).all(|k| self.block(k) & !other.block(k) == 0)
    }

    /// Indices of all touched fields, ascending
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |index| self.bit(*index))
    }

    /// Byte `k` of the little-endian bit image (bit 0 of byte 0 is field 0)
    pub fn byte(&self, k: usize) -> u8 {
        let block = k / 4;
        if block >= self.block_count() {
            return 0;
        }
        (self.block(block) >> ((k % 4) * 8)) as u8
    }

    /// Bit image truncated or zero-extended to exactly `bit_len` bits,
    /// as `ceil(bit_len / 8)` bytes.
    pub fn wire_bytes(&self, bit_len: usize) -> impl Iterator<Item = u8> + '_ {
        let byte_len = bit_len.div_ceil(8);
        let kept = bit_len.min(self.len);
        (0..byte_len).map(move |k| {
            let byte = self.byte(k);
            let first_bit = k * 8;
            if first_bit + 8 <= kept {
                byte
            } else if first_bit >= kept {
                0
            } else {
                byte & ((1u16 << (kept - first_bit)) - 1) as u8
            }
        })
    }

    /// Replace the bit image from little-endian bytes.
    ///
    /// Bytes describing bits past `len` are dropped, missing bytes read as
    /// zero, so fingerprints of different lengths stay compatible.
    pub fn load_bytes(&mut self, bytes: &[u8]) {
        self.clear();
        let byte_len = self.len.div_ceil(8);
        for (k, byte) in bytes.iter().take(byte_len).enumerate() {
            *self.block_mut(k / 4) |= u32::from(*byte) << ((k % 4) * 8);
        }
        self.mask_last_block();
    }

    #[inline]
    fn check(&self, index: usize) -> Result<(), FingerprintError> {
        if index < self.len {
            Ok(())
        } else {
            Err(FingerprintError::out_of_range(index, self.len))
        }
    }

    #[inline]
    fn bit(&self, index: usize) -> bool {
        self.block(index / BLOCK_BITS) & (1 << (index % BLOCK_BITS)) != 0
    }

    #[inline]
    fn block_count(&self) -> usize {
        self.len.div_ceil(BLOCK_BITS)
    }

    #[inline]
    fn block(&self, k: usize) -> u32 {
        match k {
            0 => self.head,
            _ => self.tail.get(k - 1).copied().unwrap_or(0),
        }
    }

    #[inline]
    fn block_mut(&mut self, k: usize) -> &mut u32 {
        match k {
            0 => &mut self.head,
            _ => &mut self.tail[k - 1],
        }
    }

    fn mask_last_block(&mut self) {
        let used = self.len % BLOCK_BITS;
        let blocks = self.block_count();
        if blocks == 0 {
            self.head = 0;
        } else if used != 0 {
            *self.block_mut(blocks - 1) &= (1u32 << used) - 1;
        }
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Ord for Fingerprint {
    /// Length first, then raw bit value with the highest block most significant
    fn cmp(&self, other: &Self) -> Ordering {
        self.len.cmp(&other.len).then_with(|| {
            (0..self.block_count())
                .rev()
                .map(|k| self.block(k).cmp(&other.block(k)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    }
}

impl PartialOrd for Fingerprint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}:", self.len)?;
        for index in 0..self.len {
            f.write_str(if self.bit(index) { "1" } else { "0" })?;
        }
        f.write_str(")")
    }
}
