//! # Segment Pool
//!
//! ## Purpose
//!
//! Process-wide supply of fixed-size byte segments (`2^segment_exponent`
//! bytes) backing every [`Buffer`](crate::Buffer). Segments are allocated a
//! chunk at a time and recycled through per-chunk free lists, so a steady
//! receive/send loop stops allocating once the pool has warmed up.
//!
//! ## Locking
//!
//! ```text
//! chunks: RwLock<Vec<Chunk>>         read: acquire/release from existing chunks
//!   └─ Chunk { free: Mutex<Vec<_>> } write: append a new chunk (growth)
//! ```
//!
//! Acquisitions from different chunks proceed concurrently; only growth of
//! the chunk list takes the write lock. When `max_chunks` chunks exist and
//! all their segments are out, acquisition fails with
//! [`CodecError::PoolExhausted`] and callers back off.

use crate::error::{CodecError, CodecResult};
use config::PoolConfig;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

static GLOBAL_POOL: Lazy<Arc<SegmentPool>> =
    Lazy::new(|| Arc::new(SegmentPool::new(PoolConfig::default())));

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// One fixed-size block of bytes checked out of a [`SegmentPool`]
pub struct Segment {
    pool: u64,
    chunk: usize,
    data: Box<[u8]>,
}

impl Segment {
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Deref for Segment {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for Segment {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("pool", &self.pool)
            .field("chunk", &self.chunk)
            .field("len", &self.data.len())
            .finish()
    }
}

struct Chunk {
    free: Mutex<Vec<Box<[u8]>>>,
}

impl Chunk {
    fn allocate(segment_size: usize, count: usize) -> Self {
        let free = (0..count)
            .map(|_| vec![0u8; segment_size].into_boxed_slice())
            .collect();
        Self {
            free: Mutex::new(free),
        }
    }
}

/// Pool usage snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub chunks: usize,
    pub total_segments: usize,
    pub free_segments: usize,
    /// Lifetime acquisitions
    pub acquired: u64,
    /// Lifetime releases
    pub released: u64,
}

/// Chunked, mutex-per-chunk segment allocator
pub struct SegmentPool {
    id: u64,
    config: PoolConfig,
    chunks: RwLock<Vec<Chunk>>,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl SegmentPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            config,
            chunks: RwLock::new(Vec::new()),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// Shared pool with default sizing
    pub fn global() -> Arc<SegmentPool> {
        Arc::clone(&GLOBAL_POOL)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[inline]
    pub fn segment_exponent(&self) -> u8 {
        self.config.segment_exponent
    }

    #[inline]
    pub fn segment_size(&self) -> usize {
        self.config.segment_size()
    }

    /// Check out one segment, growing the pool by a chunk when every
    /// existing chunk is empty.
    pub fn acquire(&self) -> CodecResult<Segment> {
        if let Some(segment) = self.take_free(&self.chunks.read()) {
            self.acquired.fetch_add(1, Ordering::Relaxed);
            return Ok(segment);
        }

        let mut chunks = self.chunks.write();
        // Another thread may have grown or released while we waited
        if let Some(segment) = self.take_free(&chunks) {
            self.acquired.fetch_add(1, Ordering::Relaxed);
            return Ok(segment);
        }

        if chunks.len() >= self.config.max_chunks {
            warn!(
                chunks = chunks.len(),
                segments_per_chunk = self.config.segments_per_chunk,
                "Segment pool exhausted"
            );
            return Err(CodecError::PoolExhausted {
                chunks: chunks.len(),
                segments_per_chunk: self.config.segments_per_chunk,
            });
        }

        let chunk = Chunk::allocate(self.segment_size(), self.config.segments_per_chunk);
        let data = chunk.free.lock().pop();
        let index = chunks.len();
        chunks.push(chunk);
        debug!(
            chunk = index,
            segment_size = self.segment_size(),
            segments = self.config.segments_per_chunk,
            "Segment pool grew"
        );

        match data {
            Some(data) => {
                self.acquired.fetch_add(1, Ordering::Relaxed);
                Ok(Segment {
                    pool: self.id,
                    chunk: index,
                    data,
                })
            }
            None => Err(CodecError::PoolExhausted {
                chunks: chunks.len(),
                segments_per_chunk: self.config.segments_per_chunk,
            }),
        }
    }

    /// Return a segment to the free list of the chunk it came from.
    /// Segments of another pool are dropped.
    pub fn release(&self, segment: Segment) {
        if segment.pool != self.id {
            debug!(pool = self.id, owner = segment.pool, "Dropping foreign segment");
            return;
        }
        let chunks = self.chunks.read();
        if let Some(chunk) = chunks.get(segment.chunk) {
            chunk.free.lock().push(segment.data);
            self.released.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> PoolStats {
        let chunks = self.chunks.read();
        PoolStats {
            chunks: chunks.len(),
            total_segments: chunks.len() * self.config.segments_per_chunk,
            free_segments: chunks.iter().map(|chunk| chunk.free.lock().len()).sum(),
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
        }
    }

    fn take_free(&self, chunks: &[Chunk]) -> Option<Segment> {
        chunks.iter().enumerate().find_map(|(index, chunk)| {
            chunk.free.lock().pop().map(|data| Segment {
                pool: self.id,
                chunk: index,
                data,
            })
        })
    }
}

impl fmt::Debug for SegmentPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentPool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
