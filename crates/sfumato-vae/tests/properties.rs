//! Property-based tests for sfumato-vae tile planning and blending.

use proptest::prelude::*;
use sfumato_core::{DType, Tensor, TensorPool, TensorView};
use sfumato_vae::{AccumulationBuffer, FeatherMask, LATENT_SCALE, TileGrid};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(150))]

    /// Tiles cover every latent cell, stay inside the latent, and no cell
    /// lies in more than two tiles per axis.
    #[test]
    fn grid_covers_latent(w in 1usize..160, h in 1usize..160, tile in 1usize..80) {
        let grid = TileGrid::plan(w, h, tile * LATENT_SCALE).unwrap();
        let mut per_col = vec![0u32; w];
        let mut per_row = vec![0u32; h];
        for t in grid.tiles().filter(|t| t.row == 0) {
            prop_assert!(t.x + t.width <= w);
            for x in t.x..t.x + t.width {
                per_col[x] += 1;
            }
        }
        for t in grid.tiles().filter(|t| t.col == 0) {
            prop_assert!(t.y + t.height <= h);
            for y in t.y..t.y + t.height {
                per_row[y] += 1;
            }
        }
        prop_assert!(per_col.iter().all(|&c| c == 1 || c == 2));
        prop_assert!(per_row.iter().all(|&c| c == 1 || c == 2));
    }

    /// Accumulated mask weight is 1 at every output pixel.
    #[test]
    fn masks_partition_unity(w in 1usize..48, h in 1usize..48, tile in 2usize..24) {
        let grid = TileGrid::plan(w, h, tile * LATENT_SCALE).unwrap();
        let mut pool = TensorPool::new();
        let mut acc = AccumulationBuffer::new(1, h * LATENT_SCALE, w * LATENT_SCALE, &mut pool);
        for t in grid.tiles() {
            let mask = FeatherMask::for_tile(&t);
            let ones = Tensor::full(DType::F32, &[1, 1, mask.height(), mask.width()], 1.0);
            acc.accumulate(&TensorView::new(&ones).unwrap(), &mask, (t.pixel_x(), t.pixel_y())).unwrap();
        }
        for &wgt in acc.weights().as_slice() {
            prop_assert!((wgt - 1.0).abs() < 1e-5, "weight {}", wgt);
        }
    }
}
