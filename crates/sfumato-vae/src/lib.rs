//! Sfumato VAE - seam-free tiled decoding
//!
//! Decoding a full-resolution latent in one call needs memory proportional to
//! the image. This crate splits the latent into overlapping tiles, decodes
//! each through an external [`TileDecoder`], and blends the results:
//!
//! - [`TileGrid`] / [`Tile`] - Row-major tile plan with capped overlap
//! - [`FeatherMask`] - Separable linear ramps that sum to 1 across seams
//! - [`AccumulationBuffer`] - Weighted `sum` / `weight` buffers
//! - [`TiledVaeDecoder`] - The decode loop, with cooperative cancellation
//! - [`decode_single`] - One-call decode for small latents
//! - [`unscale_latent`], [`to_rgba8`] - Boundary conversions
//!
//! ## Example
//!
//! ```rust
//! use sfumato_core::{CancelToken, DType, Tensor, TensorPool};
//! use sfumato_vae::TiledVaeDecoder;
//!
//! let latent = Tensor::zeros(DType::F32, &[1, 4, 64, 64]);
//! let mut decoder = |tile: &Tensor| -> Result<Tensor, ()> {
//!     let d = tile.dims();
//!     Ok(Tensor::zeros(DType::F32, &[1, 3, d[2] * 8, d[3] * 8]))
//! };
//! let mut pool = TensorPool::new();
//!
//! let out = TiledVaeDecoder::new(256)
//!     .decode(&latent, 512, 512, &mut decoder, &mut pool, &CancelToken::new())
//!     .unwrap();
//! assert_eq!(out.total_tiles, 4);
//! assert_eq!(out.image.dims(), &[1, 3, 512, 512]);
//! ```

pub mod accumulate;
pub mod convert;
pub mod decode;
pub mod error;
pub mod mask;
pub mod tile;

pub use accumulate::AccumulationBuffer;
pub use convert::{VAE_SCALING_FACTOR, to_byte, to_rgba8, unscale_latent};
pub use decode::{DEFAULT_IMAGE_CHANNELS, DecodeOutcome, TileDecoder, TiledVaeDecoder, decode_single};
pub use error::DecodeError;
pub use mask::FeatherMask;
pub use tile::{DEFAULT_TILE_SIZE_PX, Edges, LATENT_SCALE, MAX_OVERLAP, Tile, TileGrid};
