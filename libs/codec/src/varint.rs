//! LEB128 varints and zigzag mapping
//!
//! Unsigned values are written 7 bits per byte, least significant group
//! first, with the high bit of each byte flagging a continuation. Signed
//! values are zigzag-mapped first so small magnitudes of either sign stay
//! short: `0 → 0, -1 → 1, 1 → 2, -2 → 3, ...`.

use crate::error::{CodecError, CodecResult};

/// Longest encoding of a `u64`
pub const MAX_VARINT_LEN: usize = 10;

#[inline]
pub const fn zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
pub const fn unzigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[inline]
pub const fn zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub const fn unzigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Bytes needed to encode `value`
#[inline]
pub const fn encoded_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Encode `value` into `out`, returning the number of bytes used
pub fn encode(mut value: u64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut len = 0;
    loop {
        let group = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out[len] = group;
            return len + 1;
        }
        out[len] = group | 0x80;
        len += 1;
    }
}

/// Decode a varint from a byte source.
///
/// Fails with [`CodecError::VarintOverflow`] when the encoding runs past
/// 64 bits; errors from `next` (typically an underrun) pass through.
pub fn decode<F>(mut next: F) -> CodecResult<u64>
where
    F: FnMut() -> CodecResult<u8>,
{
    let mut value = 0u64;
    for index in 0..MAX_VARINT_LEN {
        let byte = next()?;
        let group = u64::from(byte & 0x7F);
        if index == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(CodecError::overflow("u64"));
        }
        value |= group << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::overflow("u64"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: u64) -> (u64, usize) {
        let mut out = [0u8; MAX_VARINT_LEN];
        let len = encode(value, &mut out);
        let mut bytes = out[..len].iter().copied();
        let decoded = decode(|| bytes.next().ok_or(CodecError::end_of_stream(1, 0))).unwrap();
        (decoded, len)
    }

    #[test]
    fn test_zigzag_mapping() {
        assert_eq!(zigzag32(0), 0);
        assert_eq!(zigzag32(-1), 1);
        assert_eq!(zigzag32(1), 2);
        assert_eq!(zigzag32(-2), 3);
        assert_eq!(zigzag32(i32::MAX), 0xFFFF_FFFE);
        assert_eq!(zigzag32(i32::MIN), 0xFFFF_FFFF);
        for value in [0, -1, 1, i32::MAX, i32::MIN, 12345, -98765] {
            assert_eq!(unzigzag32(zigzag32(value)), value);
        }
        for value in [0, -1, i64::MAX, i64::MIN] {
            assert_eq!(unzigzag64(zigzag64(value)), value);
        }
    }

    #[test]
    fn test_i32_boundary_lengths() {
        let cases = [(0i32, 1usize), (-1, 1), (i32::MAX, 5), (i32::MIN, 5)];
        for (value, expected_len) in cases {
            let (decoded, len) = round_trip(u64::from(zigzag32(value)));
            assert_eq!(len, expected_len, "length of {value}");
            assert_eq!(unzigzag32(decoded as u32), value);
        }
    }

    #[test]
    fn test_encoded_len_matches_encode() {
        for value in [0, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let (decoded, len) = round_trip(value);
            assert_eq!(decoded, value);
            assert_eq!(encoded_len(value), len);
        }
        assert_eq!(encoded_len(u64::MAX), MAX_VARINT_LEN);
    }

    #[test]
    fn test_overlong_encoding_overflows() {
        let mut bytes = std::iter::repeat(0xFFu8).take(11);
        let err = decode(|| bytes.next().ok_or(CodecError::end_of_stream(1, 0))).unwrap_err();
        assert_eq!(err, CodecError::overflow("u64"));
    }

    #[test]
    fn test_truncated_encoding_underruns() {
        let mut bytes = [0x80u8].into_iter();
        let err = decode(|| bytes.next().ok_or(CodecError::end_of_stream(1, 0))).unwrap_err();
        assert!(err.is_recoverable());
    }
}
