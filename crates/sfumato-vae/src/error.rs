//! Error types for tiled decoding.

use sfumato_core::TensorError;
use thiserror::Error;

/// Failure of a decode.
///
/// Decoder failures are preserved unchanged in [`DecodeError::Decoder`].
/// Cancellation is not an error; see [`DecodeOutcome`](crate::DecodeOutcome).
#[derive(Debug, Error)]
pub enum DecodeError<E> {
    /// Latent, tile, or decoded-tile shape is wrong.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// The tile size cannot be split into latent cells.
    #[error("invalid tile size {tile_size_px}px: {reason}")]
    InvalidTileSize {
        /// Requested tile size in pixels.
        tile_size_px: usize,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The decoder failed.
    #[error("decoder failed: {0}")]
    Decoder(E),
}
