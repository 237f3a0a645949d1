//! Reuse cache for fixed-shape sample buffers.
//!
//! Buffers are keyed by `(length, channels)`. Releasing zero-fills the buffer
//! so stale audio never leaks into the next user. The pool is a control-plane
//! object; the audio path works on buffers allocated ahead of time.

use crate::buffer::MAX_CHANNELS;
use crate::{AudioBuffer, Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

type PoolKey = (usize, usize);

struct PoolEntry {
    buffer: AudioBuffer,
    last_used: u64,
    uses: u64,
}

/// Allocation/reuse counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub allocations: u64,
    pub reuses: u64,
    pub releases: u64,
    pub evictions: u64,
}

/// Pool of recycled [`AudioBuffer`]s, bounded by `max_size` entries.
pub struct BufferPool {
    max_size: usize,
    default_sample_rate: f64,
    entries: HashMap<PoolKey, Vec<PoolEntry>>,
    len: usize,
    /// Logical clock for last-used ordering.
    tick: u64,
    stats: PoolStats,
}

impl BufferPool {
    pub fn new(max_size: usize, default_sample_rate: f64) -> Self {
        Self {
            max_size: max_size.max(1),
            default_sample_rate,
            entries: HashMap::new(),
            len: 0,
            tick: 0,
            stats: PoolStats::default(),
        }
    }

    /// Get a zeroed buffer of the given shape, reusing a pooled one if possible.
    pub fn acquire(
        &mut self,
        length: usize,
        channels: usize,
        sample_rate: Option<f64>,
    ) -> Result<AudioBuffer> {
        if length == 0 {
            return Err(Error::out_of_range("length", 0.0, 1.0, usize::MAX as f64));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(Error::out_of_range(
                "channels",
                channels as f64,
                1.0,
                MAX_CHANNELS as f64,
            ));
        }
        let sample_rate = sample_rate.unwrap_or(self.default_sample_rate);

        if let Some(mut entry) = self
            .entries
            .get_mut(&(length, channels))
            .and_then(Vec::pop)
        {
            self.len -= 1;
            entry.uses += 1;
            entry.buffer.mark_reused();
            entry.buffer.set_sample_rate(sample_rate);
            self.stats.reuses += 1;
            tracing::trace!(
                buffer = %entry.buffer.id(),
                uses = entry.uses,
                "reused pooled buffer"
            );
            return Ok(entry.buffer);
        }

        self.stats.allocations += 1;
        Ok(AudioBuffer::new(channels, length, sample_rate))
    }

    /// Return a buffer to the pool. Evicts the least recently used entry
    /// first when the pool is full.
    pub fn release(&mut self, mut buffer: AudioBuffer) {
        if buffer.is_empty() {
            return;
        }
        buffer.clear();

        if self.len >= self.max_size {
            self.evict_lru();
        }

        self.tick += 1;
        let key = (buffer.len(), buffer.channel_count());
        let uses = u64::from(buffer.reuse_count()) + 1;
        self.entries.entry(key).or_default().push(PoolEntry {
            buffer,
            last_used: self.tick,
            uses,
        });
        self.len += 1;
        self.stats.releases += 1;
    }

    /// Pool a shared buffer if this is the last reference to it.
    ///
    /// Returns `false` (and leaves the buffer to its other owners) otherwise.
    pub fn release_shared(&mut self, buffer: Arc<AudioBuffer>) -> bool {
        match Arc::try_unwrap(buffer) {
            Ok(buffer) => {
                self.release(buffer);
                true
            }
            Err(_) => false,
        }
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .flat_map(|(key, list)| {
                list.iter()
                    .enumerate()
                    .map(move |(index, entry)| (*key, index, entry.last_used))
            })
            .min_by_key(|(_, _, last_used)| *last_used);

        if let Some((key, index, _)) = oldest {
            if let Some(list) = self.entries.get_mut(&key) {
                let entry = list.remove(index);
                if list.is_empty() {
                    self.entries.remove(&key);
                }
                self.len -= 1;
                self.stats.evictions += 1;
                tracing::debug!(
                    buffer = %entry.buffer.id(),
                    length = key.0,
                    channels = key.1,
                    "evicted least recently used buffer"
                );
            }
        }
    }

    /// Number of pooled buffers.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Drop every pooled buffer.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }
}
