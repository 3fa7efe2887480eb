//! Pooled `f32` scratch buffers.
//!
//! Units and workflows need short-lived intermediate buffers on every
//! forward pass. The pool hands them out as [`PooledBuffer`] guards which
//! return their storage on drop, so a buffer is released on every exit path,
//! including early `?` returns.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Configuration for a buffer pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of buffers kept per size class
    pub max_buffers_per_size: usize,
    /// Maximum buffers kept across all size classes
    pub max_total_buffers: usize,
    /// Round requested lengths up to the next power of two
    pub round_sizes: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_buffers_per_size: 16,
            max_total_buffers: 256,
            round_sizes: true,
        }
    }
}

/// Statistics about pool usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolStats {
    /// Total number of acquire calls
    pub total_acquires: u64,
    /// Acquires served from the pool
    pub cache_hits: u64,
    /// Acquires that allocated
    pub cache_misses: u64,
    /// Buffers handed back
    pub total_returns: u64,
    /// Buffers currently idle in the pool
    pub buffers_in_pool: usize,
    /// Total `f32` capacity currently idle in the pool
    pub floats_in_pool: usize,
}

impl PoolStats {
    /// Cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        if self.total_acquires == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_acquires as f64
        }
    }
}

#[derive(Debug, Default)]
struct PoolState {
    free: HashMap<usize, Vec<Vec<f32>>>,
    stats: PoolStats,
}

/// Thread-safe pool of `f32` buffers, bucketed by size class.
///
/// # Example
///
/// ```
/// use axon_core::memory_pool::BufferPool;
///
/// let pool = BufferPool::new();
/// {
///     let mut scratch = pool.acquire(10);
///     scratch[0] = 1.0;
///     assert_eq!(scratch.len(), 10);
/// } // returned here
/// assert_eq!(pool.stats().buffers_in_pool, 1);
/// ```
#[derive(Debug)]
pub struct BufferPool {
    state: Mutex<PoolState>,
    config: PoolConfig,
}

impl BufferPool {
    /// Create a pool with default configuration.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool with custom configuration.
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            config,
        }
    }

    /// The pool's configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Borrow a zero-filled buffer of exactly `len` floats.
    pub fn acquire(&self, len: usize) -> PooledBuffer<'_> {
        let size_class = self.size_class(len);
        let reused = {
            let mut state = self.lock();
            state.stats.total_acquires += 1;
            let hit = state.free.get_mut(&size_class).and_then(Vec::pop);
            match &hit {
                Some(buf) => {
                    state.stats.cache_hits += 1;
                    state.stats.buffers_in_pool -= 1;
                    state.stats.floats_in_pool -= buf.capacity();
                }
                None => state.stats.cache_misses += 1,
            }
            hit
        };

        let mut data = match reused {
            Some(buf) => {
                trace!("Pool hit: reusing buffer of {} floats", size_class);
                buf
            }
            None => Vec::with_capacity(size_class),
        };
        data.clear();
        data.resize(len, 0.0);

        PooledBuffer {
            data,
            size_class,
            pool: self,
        }
    }

    /// Snapshot of pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.lock().stats.clone()
    }

    /// Drop every idle buffer.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.free.clear();
        state.stats.buffers_in_pool = 0;
        state.stats.floats_in_pool = 0;
    }

    fn release(&self, data: Vec<f32>, size_class: usize) {
        let mut state = self.lock();
        state.stats.total_returns += 1;

        let at_total_limit = state.stats.buffers_in_pool >= self.config.max_total_buffers;
        let bucket = state.free.entry(size_class).or_default();
        if bucket.len() < self.config.max_buffers_per_size && !at_total_limit {
            let capacity = data.capacity();
            bucket.push(data);
            state.stats.buffers_in_pool += 1;
            state.stats.floats_in_pool += capacity;
        }
        // Otherwise the buffer is freed here.
    }

    fn size_class(&self, len: usize) -> usize {
        if self.config.round_sizes {
            len.next_power_of_two()
        } else {
            len
        }
    }

    // A panic while holding the lock cannot leave the counters in a state
    // worse than stale, so poisoning is not treated as fatal.
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffer borrowed from a [`BufferPool`]; returned on drop.
pub struct PooledBuffer<'a> {
    data: Vec<f32>,
    size_class: usize,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.data
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.pool.release(data, self.size_class);
    }
}

static GLOBAL_POOL: Lazy<Arc<BufferPool>> = Lazy::new(|| Arc::new(BufferPool::new()));

/// The process-wide pool used by units that were not given one.
pub fn global_pool() -> Arc<BufferPool> {
    Arc::clone(&GLOBAL_POOL)
}
