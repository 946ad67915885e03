//! Sfumato Core - tensor primitives for the diffusion sampling core
//!
//! This crate provides the data types every sampling stage exchanges, designed
//! to keep memory bounded across the hundreds of per-step allocations a
//! generation makes.
//!
//! # Core Abstractions
//!
//! - [`Tensor`] - Owned, shape-tagged `f16`/`f32` buffer with exactly one owner
//! - [`DType`] - Element type tag
//! - [`TensorPool`] - Keyed recycler; released storage comes back zeroed
//! - [`Nchw`], [`TensorView`], [`TensorViewMut`] - Strided NCHW access with a
//!   single offset formula
//! - [`TensorError`] - Shape and length errors; elementwise ops never broadcast
//! - [`CancelToken`] - Cooperative cancellation shared across threads
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default `std`
//! feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sfumato-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use sfumato_core::{DType, TensorPool};
//!
//! let mut pool = TensorPool::with_capacity(4);
//! let mut latent = pool.acquire(DType::F32, &[1, 4, 64, 64]);
//! latent.fill(0.5);
//! let mut scratch = pool.acquire_copy(&latent);
//! scratch.scale(2.0);
//! pool.release(scratch);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod cancel;
pub mod error;
pub mod math;
pub mod pool;
pub mod tensor;
pub mod view;

pub use cancel::CancelToken;
pub use error::TensorError;
pub use pool::{DEFAULT_POOL_CAPACITY, PoolStats, TensorPool};
pub use tensor::{DType, Tensor, element_count};
pub use view::{Nchw, TensorView, TensorViewMut, copy_window};
