//! Tiled and single-shot decoding.
//!
//! [`TiledVaeDecoder::decode`] walks a [`TileGrid`] in row-major order:
//!
//! 1. copy the tile's latent window into a zero-padded `extent × extent`
//!    buffer (every decoder call sees the same shape)
//! 2. decode it
//! 3. accumulate the decoded footprint under its [`FeatherMask`]
//!
//! and finally normalizes by the accumulated weight. Peak decoder memory is
//! bounded by the tile size, not the image size.

use sfumato_core::{
    CancelToken, DType, Nchw, Tensor, TensorError, TensorPool, TensorView, TensorViewMut,
    copy_window,
};

use crate::accumulate::AccumulationBuffer;
use crate::error::DecodeError;
use crate::mask::FeatherMask;
use crate::tile::{DEFAULT_TILE_SIZE_PX, LATENT_SCALE, TileGrid};

/// Channels of the placeholder image returned when a decode is cancelled
/// before its first tile.
pub const DEFAULT_IMAGE_CHANNELS: usize = 3;

/// External VAE decoder: latent `[1, C, h, w]` to image `[1, C', 8h, 8w]`.
pub trait TileDecoder {
    /// Failure type of the decoder call.
    type Error;

    /// Decodes one latent tile.
    fn decode(&mut self, latent_tile: &Tensor) -> Result<Tensor, Self::Error>;
}

impl<F, E> TileDecoder for F
where
    F: FnMut(&Tensor) -> Result<Tensor, E>,
{
    type Error = E;

    fn decode(&mut self, latent_tile: &Tensor) -> Result<Tensor, E> {
        self(latent_tile)
    }
}

/// Result of a tiled decode.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    /// `[1, C, H, W]` image. Partial (zero where no tile landed) when
    /// cancelled.
    pub image: Tensor,
    /// Tiles decoded.
    pub decoded_tiles: usize,
    /// Tiles in the grid.
    pub total_tiles: usize,
    /// True when the decode stopped early on request.
    pub cancelled: bool,
}

/// Decodes large latents tile by tile with feathered seams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiledVaeDecoder {
    tile_size_px: usize,
}

impl TiledVaeDecoder {
    /// Creates a decoder using `tile_size_px`-pixel tiles.
    ///
    /// `tile_size_px` is the stride between tiles. Each tile is padded by the
    /// overlap band (`min(tile/4, 8)` latent cells, so 64 px at the default),
    /// and the [`TileDecoder`] receives latents of
    /// `tile_size_px / 8 + overlap` cells on a side: 40×40 latent, 320 px
    /// decoded, for 256 px tiles. Size decoder memory for the padded tile.
    pub fn new(tile_size_px: usize) -> Self {
        Self { tile_size_px }
    }

    /// Tile size in pixels.
    pub fn tile_size_px(&self) -> usize {
        self.tile_size_px
    }

    /// Plans the grid for a latent of the given size.
    pub fn plan(&self, latent_width: usize, latent_height: usize) -> Result<TileGrid, TensorError> {
        TileGrid::plan(latent_width, latent_height, self.tile_size_px)
    }

    /// Decodes `latent` (`[1, C, H/8, W/8]`) into a `W × H` image.
    ///
    /// `cancel` is checked before every tile; on cancel the partially
    /// blended image is returned with [`DecodeOutcome::cancelled`] set.
    pub fn decode<D: TileDecoder>(
        &self,
        latent: &Tensor,
        output_width: usize,
        output_height: usize,
        decoder: &mut D,
        pool: &mut TensorPool,
        cancel: &CancelToken,
    ) -> Result<DecodeOutcome, DecodeError<D::Error>> {
        let src = TensorView::new(latent)?;
        let shape = src.shape();
        if self.tile_size_px < LATENT_SCALE || self.tile_size_px % LATENT_SCALE != 0 {
            return Err(DecodeError::InvalidTileSize {
                tile_size_px: self.tile_size_px,
                reason: "must be a positive multiple of 8",
            });
        }
        check_output_size(shape, output_width, output_height)?;
        let grid = self.plan(shape.w, shape.h)?;
        let extent = grid.extent();

        tracing::debug!(
            tiles_x = grid.tiles_x(),
            tiles_y = grid.tiles_y(),
            overlap = grid.overlap(),
            extent,
            "tiled decode started"
        );

        let mut acc: Option<AccumulationBuffer> = None;
        let mut decoded_tiles = 0;
        let mut cancelled = false;

        for tile in grid.tiles() {
            if cancel.is_cancelled() {
                cancelled = true;
                tracing::info!(tile = tile.index, total = grid.len(), "tiled decode cancelled");
                break;
            }

            let mut input = pool.acquire(latent.dtype(), &[1, shape.c, extent, extent]);
            copy_window(
                &src,
                (tile.y, tile.x),
                &mut TensorViewMut::new(&mut input)?,
                (0, 0),
                (tile.height, tile.width),
            )?;
            let decoded = decoder.decode(&input).map_err(DecodeError::Decoder)?;
            pool.release(input);

            let view = TensorView::new(&decoded)?;
            let out = view.shape();
            let side = extent * LATENT_SCALE;
            if out.n != 1 || out.h != side || out.w != side {
                return Err(TensorError::shape_mismatch(&[1, out.c, side, side], &out.dims()).into());
            }
            let buffer = acc.get_or_insert_with(|| {
                AccumulationBuffer::new(out.c, output_height, output_width, pool)
            });
            buffer.accumulate(&view, &FeatherMask::for_tile(&tile), (tile.pixel_x(), tile.pixel_y()))?;
            pool.release(decoded);
            decoded_tiles += 1;

            tracing::trace!(tile = tile.index, x = tile.x, y = tile.y, "tile decoded");
        }

        let image = match acc {
            Some(acc) => acc.resolve(pool),
            None => pool.acquire(
                DType::F32,
                &[1, DEFAULT_IMAGE_CHANNELS, output_height, output_width],
            ),
        };

        Ok(DecodeOutcome {
            image,
            decoded_tiles,
            total_tiles: grid.len(),
            cancelled,
        })
    }
}

impl Default for TiledVaeDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_SIZE_PX)
    }
}

/// Decodes `latent` in one decoder call.
pub fn decode_single<D: TileDecoder>(
    latent: &Tensor,
    decoder: &mut D,
) -> Result<Tensor, DecodeError<D::Error>> {
    let shape = Nchw::from_dims(latent.dims())?;
    check_output_size(shape, shape.w * LATENT_SCALE, shape.h * LATENT_SCALE)?;
    let image = decoder.decode(latent).map_err(DecodeError::Decoder)?;
    let out = Nchw::from_dims(image.dims())?;
    if out.n != 1 || out.h != shape.h * LATENT_SCALE || out.w != shape.w * LATENT_SCALE {
        let expected = [1, out.c, shape.h * LATENT_SCALE, shape.w * LATENT_SCALE];
        return Err(TensorError::shape_mismatch(&expected, &out.dims()).into());
    }
    Ok(image)
}

fn check_output_size(latent: Nchw, width: usize, height: usize) -> Result<(), TensorError> {
    if latent.n != 1 {
        return Err(TensorError::invalid_shape(&latent.dims(), "expected a single latent"));
    }
    if width != latent.w * LATENT_SCALE || height != latent.h * LATENT_SCALE {
        return Err(TensorError::invalid_shape(
            &[height, width],
            "output size must be 8x the latent size",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nearest-neighbour upsample of channel 0 into 3 channels.
    fn upsample(latent: &Tensor) -> Result<Tensor, TensorError> {
        let v = TensorView::new(latent)?;
        let s = v.shape();
        let mut out = Tensor::zeros(DType::F32, &[1, 3, s.h * 8, s.w * 8]);
        let mut o = TensorViewMut::new(&mut out)?;
        for c in 0..3 {
            for y in 0..s.h * 8 {
                for x in 0..s.w * 8 {
                    *o.get_mut(0, c, y, x).unwrap() = v.get(0, 0, y / 8, x / 8).unwrap();
                }
            }
        }
        Ok(out)
    }

    #[test]
    fn constant_latent_decodes_to_constant_image() {
        let latent = Tensor::full(DType::F32, &[1, 4, 64, 64], 0.25);
        let mut pool = TensorPool::new();
        let mut decoder = upsample;
        let out = TiledVaeDecoder::new(256)
            .decode(&latent, 512, 512, &mut decoder, &mut pool, &CancelToken::new())
            .unwrap();
        assert_eq!(out.decoded_tiles, 4);
        assert_eq!(out.total_tiles, 4);
        assert!(!out.cancelled);
        assert_eq!(out.image.dims(), &[1, 3, 512, 512]);
        assert!(out.image.as_slice().iter().all(|&v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn decoder_sees_padded_tiles() {
        let latent = Tensor::zeros(DType::F32, &[1, 4, 64, 64]);
        let mut pool = TensorPool::new();
        let mut seen = Vec::new();
        let mut decoder = |tile: &Tensor| -> Result<Tensor, TensorError> {
            seen.push(tile.dims().to_vec());
            upsample(tile)
        };
        TiledVaeDecoder::new(256)
            .decode(&latent, 512, 512, &mut decoder, &mut pool, &CancelToken::new())
            .unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|d| d == &[1, 4, 40, 40]));
    }

    #[test]
    fn single_matches_tiled_for_piecewise_latent() {
        let data: Vec<f32> = (0..4 * 24 * 40).map(|i| ((i % 40) / 5) as f32 * 0.1).collect();
        let latent = Tensor::from_vec(DType::F32, &[1, 4, 24, 40], data).unwrap();
        let mut pool = TensorPool::new();
        let mut decoder = upsample;
        let whole = decode_single(&latent, &mut decoder).unwrap();
        let tiled = TiledVaeDecoder::new(128)
            .decode(&latent, 320, 192, &mut decoder, &mut pool, &CancelToken::new())
            .unwrap();
        for (a, b) in whole.as_slice().iter().zip(tiled.image.as_slice()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn rejects_bad_tile_size() {
        let latent = Tensor::zeros(DType::F32, &[1, 4, 8, 8]);
        let mut pool = TensorPool::new();
        let mut decoder = upsample;
        let err = TiledVaeDecoder::new(12)
            .decode(&latent, 64, 64, &mut decoder, &mut pool, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTileSize { tile_size_px: 12, .. }));
    }

    #[test]
    fn rejects_mismatched_output_size() {
        let latent = Tensor::zeros(DType::F32, &[1, 4, 8, 8]);
        let mut pool = TensorPool::new();
        let mut decoder = upsample;
        let err = TiledVaeDecoder::default()
            .decode(&latent, 64, 32, &mut decoder, &mut pool, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, DecodeError::Tensor(TensorError::InvalidShape { .. })));
    }

    #[test]
    fn wrong_decoder_output_is_reported() {
        let latent = Tensor::zeros(DType::F32, &[1, 4, 8, 8]);
        let mut decoder =
            |_: &Tensor| -> Result<Tensor, ()> { Ok(Tensor::zeros(DType::F32, &[1, 3, 8, 8])) };
        let err = decode_single(&latent, &mut decoder).unwrap_err();
        assert!(matches!(err, DecodeError::Tensor(TensorError::ShapeMismatch { .. })));
    }
}
