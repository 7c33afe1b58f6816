//! # Segmented Buffer
//!
//! ## Purpose
//!
//! Growable byte store built from pooled fixed-size [`Segment`]s. Bytes are
//! never moved between segments: growth appends segments, compaction drops
//! leading ones. A logical window `[front, back)` lives inside the
//! concatenated segment space with a `position` cursor for sequential access
//! and an optional `marker` that bounds reads (used to fence nested payloads).
//!
//! ```text
//!  segment 0        segment 1        segment 2        segment 3 (spare)
//! [........|=======|================|=====....|.......][................]
//!          front   position                   back    capacity
//! ```
//!
//! Invariant: `front <= position <= back <= capacity`.
//!
//! ## Room Factor
//!
//! Receive loops call [`Buffer::list_available_segments`] to get the unused
//! tail for a scatter read. Each call pre-allocates `2^room_level` segments of
//! slack. If the previous slack was filled completely before the next call,
//! the level rises (up to the configured maximum); otherwise it decays
//! (down to the minimum). Bursty links earn larger reads, idle ones give
//! segments back on [`Buffer::trim`].
//!
//! ## Thread Safety
//!
//! A buffer is owned by one flow of control at a time; it is `Send` but
//! carries no internal locking.

use crate::error::{CodecError, CodecResult};
use crate::pool::{Segment, SegmentPool};
use config::defaults::room::LEVEL_CEILING;
use config::BufferConfig;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Pooled, segment-backed byte buffer with a read/write cursor
pub struct Buffer {
    pool: Arc<SegmentPool>,
    segments: Vec<Segment>,
    shift: u8,
    front: usize,
    position: usize,
    back: usize,
    marker: Option<usize>,
    room_level: u8,
    room_min: u8,
    room_max: u8,
    last_slack: usize,
    back_at_check: usize,
}

impl Buffer {
    /// Empty buffer drawing from the global pool with default room bounds
    pub fn new() -> Self {
        Self::with_pool(SegmentPool::global(), &BufferConfig::default())
    }

    /// Buffer drawing from `pool`. Room levels outside `config`'s valid
    /// range are clamped.
    pub fn with_pool(pool: Arc<SegmentPool>, config: &BufferConfig) -> Self {
        if let Err(err) = config.validate() {
            warn!(error = %err, "Clamping buffer room levels");
        }
        let room_max = config.room_level_max.min(LEVEL_CEILING);
        let room_min = config.room_level_min.min(room_max);
        Self {
            shift: pool.segment_exponent(),
            pool,
            segments: Vec::new(),
            front: 0,
            position: 0,
            back: 0,
            marker: None,
            room_level: config.initial_room_level.clamp(room_min, room_max),
            room_min,
            room_max,
            last_slack: 0,
            back_at_check: 0,
        }
    }

    /// Buffer holding a copy of `bytes`, cursor at the start
    pub fn from_slice(bytes: &[u8]) -> CodecResult<Self> {
        let mut buffer = Self::new();
        buffer.write(bytes)?;
        buffer.rewind();
        Ok(buffer)
    }

    #[inline]
    pub fn segment_size(&self) -> usize {
        1 << self.shift
    }

    /// Bytes of segment storage currently held
    #[inline]
    pub fn capacity(&self) -> usize {
        self.segments.len() << self.shift
    }

    /// Bytes in the window `[front, back)`
    #[inline]
    pub fn len(&self) -> usize {
        self.back - self.front
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.back == self.front
    }

    /// Cursor relative to `front`
    #[inline]
    pub fn position(&self) -> usize {
        self.position - self.front
    }

    /// Move the cursor; `position` must stay within `[0, len]`. A marker
    /// left behind the cursor stops bounding reads and is dropped by the
    /// next [`Buffer::trim`].
    pub fn set_position(&mut self, position: usize) -> CodecResult<()> {
        if position > self.len() {
            return Err(CodecError::position_out_of_range(position, self.len()));
        }
        self.position = self.front + position;
        Ok(())
    }

    /// Bytes readable before the marker (or `back` when unset)
    #[inline]
    pub fn remaining(&self) -> usize {
        self.read_limit().saturating_sub(self.position)
    }

    /// Marker relative to `front`, if set
    pub fn marker(&self) -> Option<usize> {
        self.marker.map(|marker| marker - self.front)
    }

    /// Bound reads at `marker` bytes past `front`
    pub fn set_marker(&mut self, marker: usize) -> CodecResult<()> {
        if marker > self.len() {
            return Err(CodecError::position_out_of_range(marker, self.len()));
        }
        self.marker = Some(self.front + marker);
        Ok(())
    }

    pub fn clear_marker(&mut self) {
        self.marker = None;
    }

    /// Cut the window to its first `len` bytes. Cursor and marker are
    /// pulled back inside the new window; segments are kept.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len() {
            return;
        }
        self.back = self.front + len;
        self.position = self.position.min(self.back);
        self.marker = self.marker.map(|marker| marker.min(self.back));
        self.back_at_check = self.back_at_check.min(self.back);
    }

    /// Cursor back to `front`
    pub fn rewind(&mut self) {
        self.position = self.front;
    }

    /// Empty the window, keeping segments for reuse
    pub fn reset(&mut self) {
        self.front = 0;
        self.position = 0;
        self.back = 0;
        self.marker = None;
        self.back_at_check = 0;
        self.last_slack = 0;
    }

    /// Current room factor exponent
    #[inline]
    pub fn room_level(&self) -> u8 {
        self.room_level
    }

    /// Fail with an underrun unless `len` bytes are readable at the cursor
    pub fn check_length_to_read(&self, len: usize) -> CodecResult<()> {
        let available = self.remaining();
        if len > available {
            Err(CodecError::end_of_stream(len, available))
        } else {
            Ok(())
        }
    }

    /// Grow segment storage so `len` bytes fit at the cursor
    pub fn ensure_capacity_to_write(&mut self, len: usize) -> CodecResult<()> {
        let needed = self.position + len;
        while self.capacity() < needed {
            let segment = self.pool.acquire()?;
            self.segments.push(segment);
        }
        Ok(())
    }

    /// Copy `bytes` in at the cursor, extending `back` as needed
    pub fn write(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.ensure_capacity_to_write(bytes.len())?;
        let mut rest = bytes;
        while !rest.is_empty() {
            let (index, offset) = self.locate(self.position);
            let segment = &mut self.segments[index];
            let count = rest.len().min(segment.len() - offset);
            segment[offset..offset + count].copy_from_slice(&rest[..count]);
            rest = &rest[count..];
            self.position += count;
        }
        self.back = self.back.max(self.position);
        Ok(())
    }

    /// Fill `out` from the cursor
    pub fn read(&mut self, out: &mut [u8]) -> CodecResult<()> {
        self.check_length_to_read(out.len())?;
        let mut filled = 0;
        while filled < out.len() {
            let (index, offset) = self.locate(self.position);
            let segment = &self.segments[index];
            let count = (out.len() - filled).min(segment.len() - offset);
            out[filled..filled + count].copy_from_slice(&segment[offset..offset + count]);
            filled += count;
            self.position += count;
        }
        Ok(())
    }

    /// Read `len` bytes into a fresh vector
    pub fn read_vec(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        self.check_length_to_read(len)?;
        let mut out = vec![0u8; len];
        self.read(&mut out)?;
        Ok(out)
    }

    #[inline]
    pub fn get_byte(&mut self) -> CodecResult<u8> {
        self.check_length_to_read(1)?;
        let (index, offset) = self.locate(self.position);
        self.position += 1;
        Ok(self.segments[index][offset])
    }

    #[inline]
    pub fn put_byte(&mut self, byte: u8) -> CodecResult<()> {
        self.ensure_capacity_to_write(1)?;
        let (index, offset) = self.locate(self.position);
        self.segments[index][offset] = byte;
        self.position += 1;
        self.back = self.back.max(self.position);
        Ok(())
    }

    /// Advance the cursor without copying
    pub fn skip(&mut self, len: usize) -> CodecResult<()> {
        self.check_length_to_read(len)?;
        self.position += len;
        Ok(())
    }

    /// Unused tail capacity as scatter targets for a receive.
    ///
    /// Adjusts the room factor from how much of the previous slack was
    /// consumed, then makes sure `2^room_level` segments of slack exist.
    /// Publish received bytes with [`Buffer::commit`].
    pub fn list_available_segments(&mut self) -> CodecResult<Vec<&mut [u8]>> {
        if self.last_slack > 0 {
            let used = self.back.saturating_sub(self.back_at_check);
            let previous = self.room_level;
            if used >= self.last_slack {
                self.room_level = (self.room_level + 1).min(self.room_max);
            } else {
                self.room_level = self.room_level.saturating_sub(1).max(self.room_min);
            }
            if previous != self.room_level {
                trace!(
                    from = previous,
                    to = self.room_level,
                    used,
                    slack = self.last_slack,
                    "Buffer room factor adjusted"
                );
            }
        }

        let wanted = (1usize << self.room_level) << self.shift;
        while self.capacity() - self.back < wanted {
            let segment = self.pool.acquire()?;
            self.segments.push(segment);
        }

        self.last_slack = self.capacity() - self.back;
        self.back_at_check = self.back;

        let (first, offset) = self.locate(self.back);
        Ok(self
            .segments
            .iter_mut()
            .enumerate()
            .skip(first)
            .map(|(index, segment)| {
                if index == first {
                    &mut segment[offset..]
                } else {
                    &mut segment[..]
                }
            })
            .collect())
    }

    /// Publish `len` bytes written into the tail returned by
    /// [`Buffer::list_available_segments`]
    pub fn commit(&mut self, len: usize) -> CodecResult<()> {
        if self.back + len > self.capacity() {
            return Err(CodecError::position_out_of_range(
                self.back + len - self.front,
                self.capacity() - self.front,
            ));
        }
        self.back += len;
        Ok(())
    }

    /// Readable bytes from the cursor to `back`, as gather sources for a send
    pub fn readable_segments(&self) -> Vec<&[u8]> {
        let mut slices = Vec::new();
        let mut at = self.position;
        while at < self.back {
            let (index, offset) = self.locate(at);
            let segment = &self.segments[index];
            let end = (segment.len()).min(offset + (self.back - at));
            slices.push(&segment[offset..end]);
            at += end - offset;
        }
        slices
    }

    /// Copy of the whole window `[front, back)`
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        let mut at = self.front;
        while at < self.back {
            let (index, offset) = self.locate(at);
            let segment = &self.segments[index];
            let end = segment.len().min(offset + (self.back - at));
            out.extend_from_slice(&segment[offset..end]);
            at += end - offset;
        }
        out
    }

    /// Drop everything before the cursor.
    ///
    /// Fully consumed leading segments go back to the pool, except up to
    /// `2^room_level` that are recycled as tail slack. The cursor becomes
    /// position 0 of the new window.
    pub fn trim(&mut self) {
        self.front = self.position;
        if self.marker.is_some_and(|marker| marker < self.front) {
            self.marker = None;
        }
        let consumed = self.front >> self.shift;
        if consumed == 0 {
            return;
        }

        let spare = (self.capacity() - self.back) >> self.shift;
        let retain = consumed.min((1usize << self.room_level).saturating_sub(spare));
        let drained: Vec<Segment> = self.segments.drain(..consumed).collect();
        for (index, segment) in drained.into_iter().enumerate() {
            if index < retain {
                self.segments.push(segment);
            } else {
                self.pool.release(segment);
            }
        }

        let shifted = consumed << self.shift;
        self.front -= shifted;
        self.position -= shifted;
        self.back -= shifted;
        self.marker = self.marker.map(|marker| marker - shifted);
        self.back_at_check = self.back_at_check.saturating_sub(shifted);
        trace!(
            released = consumed - retain,
            retained = retain,
            segments = self.segments.len(),
            "Buffer trimmed"
        );
    }

    #[inline]
    fn read_limit(&self) -> usize {
        self.marker.unwrap_or(self.back)
    }

    #[inline]
    fn locate(&self, at: usize) -> (usize, usize) {
        (at >> self.shift, at & (self.segment_size() - 1))
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        for segment in self.segments.drain(..) {
            self.pool.release(segment);
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("front", &self.front)
            .field("position", &self.position)
            .field("back", &self.back)
            .field("capacity", &self.capacity())
            .field("marker", &self.marker)
            .field("room_level", &self.room_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::PoolConfig;

    fn tiny_buffer() -> Buffer {
        let pool = Arc::new(SegmentPool::new(PoolConfig {
            segment_exponent: 4,
            segments_per_chunk: 8,
            max_chunks: 16,
        }));
        Buffer::with_pool(
            pool,
            &BufferConfig {
                room_level_min: 0,
                room_level_max: 3,
                initial_room_level: 1,
            },
        )
    }

    #[test]
    fn test_write_read_across_segments() {
        let mut buffer = tiny_buffer();
        let data: Vec<u8> = (0..50).collect();
        buffer.write(&data).unwrap();
        assert_eq!(buffer.len(), 50);
        assert_eq!(buffer.capacity(), 64);

        buffer.rewind();
        let mut out = vec![0u8; 50];
        buffer.read(&mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(buffer.remaining(), 0);
    }

    #[test]
    fn test_read_past_back_is_underrun() {
        let mut buffer = tiny_buffer();
        buffer.write(&[1, 2, 3]).unwrap();
        buffer.rewind();
        let err = buffer.read_vec(4).unwrap_err();
        assert_eq!(err, CodecError::end_of_stream(4, 3));
        assert!(err.is_recoverable());
        // Nothing consumed on failure
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn test_marker_bounds_reads() {
        let mut buffer = tiny_buffer();
        buffer.write(&[1, 2, 3, 4]).unwrap();
        buffer.rewind();
        buffer.set_marker(2).unwrap();
        assert_eq!(buffer.get_byte().unwrap(), 1);
        assert_eq!(buffer.get_byte().unwrap(), 2);
        assert!(buffer.get_byte().is_err());
        buffer.clear_marker();
        assert_eq!(buffer.get_byte().unwrap(), 3);
    }

    #[test]
    fn test_position_setter_is_bounded() {
        let mut buffer = tiny_buffer();
        buffer.write(&[0; 5]).unwrap();
        buffer.set_position(5).unwrap();
        assert_eq!(
            buffer.set_position(6),
            Err(CodecError::position_out_of_range(6, 5))
        );
    }

    #[test]
    fn test_trim_releases_consumed_segments() {
        let mut buffer = tiny_buffer();
        buffer.write(&[7u8; 70]).unwrap();
        buffer.set_position(40).unwrap();
        buffer.trim();

        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.len(), 30);
        let rest = buffer.read_vec(30).unwrap();
        assert!(rest.iter().all(|b| *b == 7));
        assert!(buffer.front <= buffer.position);
        assert!(buffer.back <= buffer.capacity());
    }

    #[test]
    fn test_room_factor_grows_when_slack_filled() {
        let mut buffer = tiny_buffer();
        let slack: usize = buffer
            .list_available_segments()
            .unwrap()
            .iter()
            .map(|s| s.len())
            .sum();
        assert_eq!(slack, 32);
        assert_eq!(buffer.room_level(), 1);

        buffer.commit(slack).unwrap();
        buffer.list_available_segments().unwrap();
        assert_eq!(buffer.room_level(), 2);

        // Barely used: decays
        buffer.commit(1).unwrap();
        buffer.list_available_segments().unwrap();
        assert_eq!(buffer.room_level(), 1);
    }

    #[test]
    fn test_room_factor_respects_bounds() {
        let mut buffer = tiny_buffer();
        for _ in 0..10 {
            let slack: usize = buffer
                .list_available_segments()
                .unwrap()
                .iter()
                .map(|s| s.len())
                .sum();
            buffer.commit(slack).unwrap();
        }
        assert_eq!(buffer.room_level(), 3);

        for _ in 0..10 {
            buffer.list_available_segments().unwrap();
        }
        assert_eq!(buffer.room_level(), 0);
    }

    #[test]
    fn test_scatter_then_commit_is_readable() {
        let mut buffer = tiny_buffer();
        buffer.write(&[1, 2, 3]).unwrap();
        {
            let mut tail = buffer.list_available_segments().unwrap();
            tail[0][..2].copy_from_slice(&[4, 5]);
        }
        buffer.commit(2).unwrap();
        buffer.rewind();
        assert_eq!(buffer.read_vec(5).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_gather_segments_cover_readable_bytes() {
        let mut buffer = tiny_buffer();
        let data: Vec<u8> = (0..40).collect();
        buffer.write(&data).unwrap();
        buffer.set_position(10).unwrap();
        let gathered: Vec<u8> = buffer.readable_segments().concat();
        assert_eq!(gathered, data[10..].to_vec());
        assert_eq!(buffer.to_vec(), data);
    }

    #[test]
    fn test_truncate_cuts_window() {
        let mut buffer = tiny_buffer();
        buffer.write(&[1, 2, 3, 4, 5, 6]).unwrap();
        buffer.set_marker(5).unwrap();
        buffer.truncate(3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.position(), 3);
        assert_eq!(buffer.marker(), Some(3));
        assert_eq!(buffer.to_vec(), vec![1, 2, 3]);

        buffer.truncate(10);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_trim_past_marker_drops_it() {
        let mut buffer = tiny_buffer();
        buffer.write(&[0; 8]).unwrap();
        buffer.set_marker(2).unwrap();
        buffer.set_position(5).unwrap();
        buffer.trim();
        assert_eq!(buffer.marker(), None);
        assert_eq!(buffer.len(), 3);

        // Same across a segment boundary
        let mut buffer = tiny_buffer();
        buffer.write(&[0; 40]).unwrap();
        buffer.set_marker(3).unwrap();
        buffer.set_position(20).unwrap();
        buffer.trim();
        assert_eq!(buffer.marker(), None);
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.len(), 20);
    }

    #[test]
    fn test_trim_keeps_marker_ahead_of_cursor() {
        let mut buffer = tiny_buffer();
        buffer.write(&[0; 40]).unwrap();
        buffer.set_marker(30).unwrap();
        buffer.set_position(20).unwrap();
        buffer.trim();
        assert_eq!(buffer.marker(), Some(10));
        assert_eq!(buffer.remaining(), 10);
    }

    #[test]
    fn test_out_of_range_room_levels_are_clamped() {
        let pool = Arc::new(SegmentPool::new(PoolConfig {
            segment_exponent: 4,
            segments_per_chunk: 8,
            max_chunks: 16,
        }));
        let buffer = Buffer::with_pool(
            pool,
            &BufferConfig {
                room_level_min: 70,
                room_level_max: 200,
                initial_room_level: 90,
            },
        );
        assert_eq!(buffer.room_level(), LEVEL_CEILING);
        assert_eq!(buffer.room_max, LEVEL_CEILING);
        assert_eq!(buffer.room_min, LEVEL_CEILING);
    }

    #[test]
    fn test_drop_returns_segments() {
        let pool = Arc::new(SegmentPool::new(PoolConfig {
            segment_exponent: 4,
            segments_per_chunk: 4,
            max_chunks: 1,
        }));
        {
            let mut buffer = Buffer::with_pool(Arc::clone(&pool), &BufferConfig::default());
            buffer.write(&[0u8; 64]).unwrap();
            assert_eq!(pool.stats().free_segments, 0);
        }
        assert_eq!(pool.stats().free_segments, 4);
    }
}
