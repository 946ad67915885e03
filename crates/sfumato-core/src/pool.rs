//! Keyed recycler for fixed-shape tensor storage.
//!
//! A sampling run allocates the same handful of shapes hundreds of times
//! (scaled input, two predictions, guided output, noise). The [`TensorPool`]
//! keeps released tensors in per-`(dtype, dims)` buckets and hands them back
//! on the next matching [`acquire`](TensorPool::acquire), zeroed. Buckets are
//! looked up by borrowed dims, so a hit allocates nothing; only the first
//! release of a new shape stores an owned key.
//!
//! The pool is an explicit handle, not a global: every call that needs scratch
//! tensors takes `&mut TensorPool`. It is single-consumer by construction;
//! concurrent generations each own an independent pool.
//!
//! # Example
//!
//! ```rust
//! use sfumato_core::{DType, TensorPool};
//!
//! let mut pool = TensorPool::new();
//! let mut t = pool.acquire(DType::F32, &[1, 4, 64, 64]);
//! t.fill(1.0);
//! pool.release(t);
//!
//! // Same key: the storage is reused and arrives zeroed.
//! let t = pool.acquire(DType::F32, &[1, 4, 64, 64]);
//! assert!(t.as_slice().iter().all(|&v| v == 0.0));
//! assert_eq!(pool.stats().hits, 1);
//! ```

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, vec, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeMap;

use crate::tensor::{DType, Tensor};

/// Default number of buffers retained per `(dtype, dims)` key.
pub const DEFAULT_POOL_CAPACITY: usize = 8;

/// Buckets by dtype, then by dims. `Vec<usize>: Borrow<[usize]>` lets lookups
/// use the caller's slice.
type Buckets = BTreeMap<DType, BTreeMap<Vec<usize>, Vec<Tensor>>>;

/// Allocation counters for a [`TensorPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquisitions served from a bucket.
    pub hits: u64,
    /// Acquisitions that allocated fresh storage.
    pub misses: u64,
    /// Releases dropped because the bucket was full.
    pub discarded: u64,
}

/// Keyed allocator/recycler for tensor storage.
#[derive(Debug)]
pub struct TensorPool {
    buckets: Buckets,
    capacity_per_key: usize,
    stats: PoolStats,
}

impl TensorPool {
    /// Creates a pool retaining up to [`DEFAULT_POOL_CAPACITY`] buffers per key.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Creates a pool retaining up to `capacity_per_key` buffers per key.
    ///
    /// A capacity of zero disables recycling: every release is discarded.
    pub fn with_capacity(capacity_per_key: usize) -> Self {
        Self {
            buckets: BTreeMap::new(),
            capacity_per_key,
            stats: PoolStats::default(),
        }
    }

    /// Maximum buffers retained per key.
    pub fn capacity_per_key(&self) -> usize {
        self.capacity_per_key
    }

    /// Returns a zero-filled tensor of the given dtype and dims.
    ///
    /// Reuses released storage when a matching bucket is non-empty.
    pub fn acquire(&mut self, dtype: DType, dims: &[usize]) -> Tensor {
        if let Some(mut tensor) = self.bucket_mut(dtype, dims).and_then(Vec::pop) {
            tensor.fill(0.0);
            self.stats.hits += 1;
            return tensor;
        }

        self.stats.misses += 1;
        #[cfg(feature = "tracing")]
        tracing::trace!(dtype = dtype.as_str(), ?dims, "tensor_pool: miss");
        Tensor::zeros(dtype, dims)
    }

    /// Acquires a tensor shaped like `like` and copies its contents.
    pub fn acquire_copy(&mut self, like: &Tensor) -> Tensor {
        let mut t = self.acquire(like.dtype(), like.dims());
        t.as_mut_slice().copy_from_slice(like.as_slice());
        t
    }

    /// Returns a tensor's storage to the pool.
    ///
    /// Ownership moves into the pool, so a released tensor cannot be mutated or
    /// released again. When the bucket for its key is full the storage is
    /// dropped instead.
    pub fn release(&mut self, tensor: Tensor) {
        let capacity = self.capacity_per_key;
        let by_dims = self.buckets.entry(tensor.dtype()).or_default();
        match by_dims.get_mut(tensor.dims()) {
            Some(bucket) if bucket.len() < capacity => bucket.push(tensor),
            None if capacity > 0 => {
                by_dims.insert(tensor.dims().to_vec(), vec![tensor]);
            }
            _ => self.stats.discarded += 1,
        }
    }

    /// Releases every tensor yielded by `tensors`.
    pub fn release_all(&mut self, tensors: impl IntoIterator<Item = Tensor>) {
        for t in tensors {
            self.release(t);
        }
    }

    /// Buffers currently held for a key.
    pub fn pooled(&self, dtype: DType, dims: &[usize]) -> usize {
        self.buckets
            .get(&dtype)
            .and_then(|by_dims| by_dims.get(dims))
            .map_or(0, Vec::len)
    }

    /// Buffers currently held across all keys.
    pub fn total_pooled(&self) -> usize {
        self.buckets
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Allocation counters.
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Drops every pooled buffer. Counters are kept.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    fn bucket_mut(&mut self, dtype: DType, dims: &[usize]) -> Option<&mut Vec<Tensor>> {
        self.buckets.get_mut(&dtype)?.get_mut(dims)
    }
}

impl Default for TensorPool {
    fn default() -> Self {
        Self::new()
    }
}
