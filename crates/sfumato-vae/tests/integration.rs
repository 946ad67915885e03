//! Integration tests for sfumato-vae.
//!
//! Checks the blend invariants on real grids: masks partition unity, seams
//! are invisible, and cancellation yields a partial image.

use std::cell::Cell;

use sfumato_core::{CancelToken, DType, Tensor, TensorPool, TensorView, TensorViewMut};
use sfumato_vae::{AccumulationBuffer, FeatherMask, LATENT_SCALE, TileGrid, TiledVaeDecoder, to_rgba8};

/// Decodes every latent cell to an 8×8 block holding `value` on all three
/// channels, so each tile's pixels are constant.
fn constant_decoder(value: f32) -> impl FnMut(&Tensor) -> Result<Tensor, ()> {
    move |tile: &Tensor| {
        let d = tile.dims();
        Ok(Tensor::full(DType::F32, &[1, 3, d[2] * LATENT_SCALE, d[3] * LATENT_SCALE], value))
    }
}

#[test]
fn masks_partition_unity_on_two_by_two_grid() {
    let grid = TileGrid::plan(64, 64, 256).unwrap();
    assert_eq!((grid.tiles_x(), grid.tiles_y()), (2, 2));

    let mut pool = TensorPool::new();
    let mut acc = AccumulationBuffer::new(1, 512, 512, &mut pool);
    for tile in grid.tiles() {
        let mask = FeatherMask::for_tile(&tile);
        let ones = Tensor::full(DType::F32, &[1, 1, mask.height(), mask.width()], 1.0);
        acc.accumulate(&TensorView::new(&ones).unwrap(), &mask, (tile.pixel_x(), tile.pixel_y()))
            .unwrap();
    }

    assert!((acc.weight_at(0, 256, 256).unwrap() - 1.0).abs() < 1e-6);
    for &w in acc.weights().as_slice() {
        assert!((w - 1.0).abs() < 1e-6, "weight {w}");
    }
}

#[test]
fn seam_bands_sum_to_one_for_uneven_grids() {
    for &(w, h, px) in &[(96, 40, 128), (70, 70, 256), (130, 17, 64)] {
        let grid = TileGrid::plan(w, h, px).unwrap();
        let band = grid.overlap() * LATENT_SCALE;
        for row in 0..grid.tiles_y() {
            for col in 0..grid.tiles_x() - 1 {
                let left = grid.tile(col, row).unwrap();
                let right = grid.tile(col + 1, row).unwrap();
                let lm = FeatherMask::for_tile(&left);
                let rm = FeatherMask::for_tile(&right);
                let offset = right.pixel_x() - left.pixel_x();
                for k in 0..band {
                    let sum = lm.columns()[offset + k] + rm.columns()[k];
                    assert!((sum - 1.0).abs() < 1e-6, "{w}x{h}/{px} col {col} k {k}");
                }
            }
        }
    }
}

#[test]
fn seam_free_gradient() {
    // A horizontal latent gradient decoded per tile with nearest upsampling
    // must match the single-shot decode everywhere, including the seams.
    let (w, h) = (72, 40);
    let mut latent = Tensor::zeros(DType::F32, &[1, 4, h, w]);
    {
        let mut v = TensorViewMut::new(&mut latent).unwrap();
        for c in 0..4 {
            for y in 0..h {
                for x in 0..w {
                    *v.get_mut(0, c, y, x).unwrap() = x as f32 / w as f32;
                }
            }
        }
    }
    let mut decoder = |tile: &Tensor| -> Result<Tensor, ()> {
        let v = TensorView::new(tile).unwrap();
        let s = v.shape();
        let mut out = Tensor::zeros(DType::F32, &[1, 3, s.h * 8, s.w * 8]);
        let mut o = TensorViewMut::new(&mut out).unwrap();
        for c in 0..3 {
            for y in 0..s.h * 8 {
                for x in 0..s.w * 8 {
                    *o.get_mut(0, c, y, x).unwrap() = v.get(0, c, y / 8, x / 8).unwrap();
                }
            }
        }
        Ok(out)
    };

    let whole = sfumato_vae::decode_single(&latent, &mut decoder).unwrap();
    let mut pool = TensorPool::new();
    let tiled = TiledVaeDecoder::new(128)
        .decode(&latent, w * 8, h * 8, &mut decoder, &mut pool, &CancelToken::new())
        .unwrap();
    for (a, b) in whole.as_slice().iter().zip(tiled.image.as_slice()) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn cancellation_returns_partial_image() {
    let latent = Tensor::zeros(DType::F32, &[1, 4, 64, 64]);
    let cancel = CancelToken::new();
    let calls = Cell::new(0);
    let mut inner = constant_decoder(0.5);
    let mut decoder = |tile: &Tensor| {
        calls.set(calls.get() + 1);
        if calls.get() == 2 {
            cancel.cancel();
        }
        inner(tile)
    };

    let mut pool = TensorPool::new();
    let out = TiledVaeDecoder::new(256)
        .decode(&latent, 512, 512, &mut decoder, &mut pool, &cancel)
        .unwrap();
    assert!(out.cancelled);
    assert_eq!(out.decoded_tiles, 2);
    assert_eq!(out.total_tiles, 4);

    let img = TensorView::new(&out.image).unwrap();
    assert!((img.get(0, 0, 10, 10).unwrap() - 0.5).abs() < 1e-6);
    assert_eq!(img.get(0, 0, 500, 10), Some(0.0));
}

#[test]
fn cancelled_before_first_tile_yields_blank_image() {
    let latent = Tensor::zeros(DType::F32, &[1, 4, 16, 16]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut decoder = constant_decoder(1.0);
    let mut pool = TensorPool::new();
    let out = TiledVaeDecoder::new(64)
        .decode(&latent, 128, 128, &mut decoder, &mut pool, &cancel)
        .unwrap();
    assert_eq!(out.decoded_tiles, 0);
    assert_eq!(out.image.dims(), &[1, 3, 128, 128]);
    assert!(out.image.as_slice().iter().all(|&v| v == 0.0));
}

#[test]
fn decoded_image_converts_to_rgba() {
    let latent = Tensor::zeros(DType::F32, &[1, 4, 8, 8]);
    let mut decoder = constant_decoder(1.0);
    let mut pool = TensorPool::new();
    let out = TiledVaeDecoder::new(32)
        .decode(&latent, 64, 64, &mut decoder, &mut pool, &CancelToken::new())
        .unwrap();
    let rgba = to_rgba8(&out.image).unwrap();
    assert_eq!(rgba.len(), 64 * 64 * 4);
    assert!(rgba.iter().all(|&b| b == 255));
}

#[test]
fn repeated_decodes_reuse_pooled_tiles() {
    let latent = Tensor::zeros(DType::F32, &[1, 4, 64, 64]);
    let mut decoder = constant_decoder(0.0);
    let mut pool = TensorPool::new();
    let tiled = TiledVaeDecoder::new(256);
    let out = tiled
        .decode(&latent, 512, 512, &mut decoder, &mut pool, &CancelToken::new())
        .unwrap();
    pool.release(out.image);
    let misses = pool.stats().misses;
    let out = tiled
        .decode(&latent, 512, 512, &mut decoder, &mut pool, &CancelToken::new())
        .unwrap();
    assert_eq!(pool.stats().misses, misses);
    assert_eq!(out.decoded_tiles, 4);
}
