//! Feather masks for overlap blending.
//!
//! A mask is separable: `w(x, y) = wx(x) · wy(y)`. Along one axis with an
//! overlap band of `L` pixels:
//!
//! ```text
//! leading band (neighbour before):   (k + ½) / L      k = 0..L
//! trailing band (neighbour after):   (L − k − ½) / L  k = 0..L
//! elsewhere, and on image edges:     1
//! ```
//!
//! The trailing ramp of one tile and the leading ramp of the next cover the
//! same `L` pixels, so their weights sum to exactly 1 across every seam and
//! never reach 0.

use sfumato_core::{DType, Tensor};

use crate::tile::{Edges, LATENT_SCALE, Tile};

/// Per-pixel blend weights for one tile footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatherMask {
    wx: Vec<f32>,
    wy: Vec<f32>,
}

impl FeatherMask {
    /// Builds a mask of `width × height` pixels ramping over `band` pixels on
    /// every edge flagged in `edges`.
    pub fn new(width: usize, height: usize, band: usize, edges: Edges) -> Self {
        Self {
            wx: axis(width, band, edges.left, edges.right),
            wy: axis(height, band, edges.top, edges.bottom),
        }
    }

    /// Mask for a tile's pixel footprint.
    pub fn for_tile(tile: &Tile) -> Self {
        Self::new(
            tile.pixel_width(),
            tile.pixel_height(),
            tile.overlap * LATENT_SCALE,
            tile.edges,
        )
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.wx.len()
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.wy.len()
    }

    /// Horizontal profile.
    pub fn columns(&self) -> &[f32] {
        &self.wx
    }

    /// Vertical profile.
    pub fn rows(&self) -> &[f32] {
        &self.wy
    }

    /// Weight at pixel `(x, y)`, or `None` outside the mask.
    pub fn weight(&self, x: usize, y: usize) -> Option<f32> {
        Some(self.wx.get(x)? * self.wy.get(y)?)
    }

    /// Dense `[1, 1, H, W]` tensor of the mask.
    pub fn to_tensor(&self) -> Tensor {
        let mut t = Tensor::zeros(DType::F32, &[1, 1, self.height(), self.width()]);
        let weights = self
            .wy
            .iter()
            .flat_map(|&wy| self.wx.iter().map(move |&wx| wx * wy));
        for (dst, w) in t.as_mut_slice().iter_mut().zip(weights) {
            *dst = w;
        }
        t
    }
}

fn axis(len: usize, band: usize, leading: bool, trailing: bool) -> Vec<f32> {
    let mut w = vec![1.0f32; len];
    if band == 0 {
        return w;
    }
    let l = band as f32;
    if leading {
        for (k, v) in w.iter_mut().take(band).enumerate() {
            *v *= (k as f32 + 0.5) / l;
        }
    }
    if trailing {
        let start = len.saturating_sub(band);
        for (k, v) in w[start..].iter_mut().enumerate() {
            *v *= (l - k as f32 - 0.5) / l;
        }
    }
    w
}
