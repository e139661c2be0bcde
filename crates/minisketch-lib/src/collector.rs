//! Per-worker output buffers
//!
//! A [`ShardedCollector`] owns one buffer per pipeline worker. Workers name
//! their shard explicitly with the [`WorkerId`] the pipeline hands to every
//! task invocation; since a worker only ever writes its own shard, the
//! per-shard locks are never contended while the pipeline runs. Draining
//! takes `&mut self`, so it can only happen once every task has finished.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::pipeline::WorkerId;

/// Append-only per-worker buffers with a single merge point
pub struct ShardedCollector<T> {
    shards: Vec<Mutex<Vec<T>>>,
}

impl<T> ShardedCollector<T> {
    /// Create a collector with `num_shards` empty shards
    pub fn new(num_shards: usize) -> Self {
        Self {
            shards: (0..num_shards).map(|_| Mutex::new(Vec::new())).collect(),
        }
    }

    /// Number of shards
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Append one value to `worker`'s shard
    #[inline]
    pub fn append(&self, worker: WorkerId, value: T) {
        self.shards[worker.index()].lock().push(value);
    }

    /// Append all values to `worker`'s shard, keeping their order
    pub fn append_all<I>(&self, worker: WorkerId, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.shards[worker.index()].lock().extend(values);
    }

    /// Total number of values across all shards
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    /// Whether every shard is empty
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    /// Drop every collected value
    pub fn clear(&mut self) {
        for shard in &mut self.shards {
            shard.get_mut().clear();
        }
    }

    /// Lazily move all values out, shard by shard in worker order
    ///
    /// Each shard is emptied when the iterator reaches it.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.shards
            .iter_mut()
            .flat_map(|shard| std::mem::take(shard.get_mut()))
    }

    /// Move all values out into one vector, shards concatenated in worker order
    pub fn drain_ordered(&mut self) -> Vec<T> {
        let total = self.shards.iter_mut().map(|shard| shard.get_mut().len()).sum();
        let mut result = Vec::with_capacity(total);
        for shard in &mut self.shards {
            result.append(shard.get_mut());
        }
        result
    }
}

impl<T: Ord + Send> ShardedCollector<T> {
    /// Move all values out, sorted ascending with duplicates removed
    pub fn drain_unique_sorted(&mut self) -> Vec<T> {
        let mut result = self.drain_ordered();
        result.par_sort_unstable();
        result.dedup();
        result
    }
}

impl<T: fmt::Display> fmt::Display for ShardedCollector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[]");
        }
        write!(f, "[")?;
        for shard in &self.shards {
            for value in shard.lock().iter() {
                write!(f, "{value}, ")?;
            }
        }
        write!(f, "]")
    }
}

impl<T> fmt::Debug for ShardedCollector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCollector")
            .field("num_shards", &self.shards.len())
            .field("len", &self.len())
            .finish()
    }
}

/// Per-worker counters summed on demand
#[derive(Debug)]
pub struct ShardedCounter {
    counts: Vec<AtomicUsize>,
}

impl ShardedCounter {
    /// Create a counter with `num_shards` zeroed slots
    pub fn new(num_shards: usize) -> Self {
        Self {
            counts: (0..num_shards).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    /// Add one to `worker`'s slot
    #[inline]
    pub fn increment(&self, worker: WorkerId) {
        self.add(worker, 1);
    }

    /// Add `value` to `worker`'s slot
    #[inline]
    pub fn add(&self, worker: WorkerId, value: usize) {
        self.counts[worker.index()].fetch_add(value, Ordering::Relaxed);
    }

    /// Sum over all slots
    pub fn get(&self) -> usize {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}
