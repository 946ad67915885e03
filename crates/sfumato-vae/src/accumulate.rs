//! Weighted accumulation of decoded tiles.
//!
//! Two same-shape buffers cover the output image. Each tile adds
//! `pixel · mask` to `sum` and `mask` to `weight`; the resolved image is
//! `sum / weight` wherever `weight > 0` and `sum` elsewhere.

use sfumato_core::{DType, Nchw, Tensor, TensorError, TensorPool, TensorView, TensorViewMut};

use crate::mask::FeatherMask;

/// Running `sum` and `weight` for one decode.
#[derive(Debug)]
pub struct AccumulationBuffer {
    shape: Nchw,
    sum: Tensor,
    weight: Tensor,
}

impl AccumulationBuffer {
    /// Acquires zeroed `[1, channels, height, width]` buffers from `pool`.
    pub fn new(channels: usize, height: usize, width: usize, pool: &mut TensorPool) -> Self {
        let shape = Nchw::new(1, channels, height, width);
        Self {
            shape,
            sum: pool.acquire(DType::F32, &shape.dims()),
            weight: pool.acquire(DType::F32, &shape.dims()),
        }
    }

    /// Image shape.
    pub fn shape(&self) -> Nchw {
        self.shape
    }

    /// Adds the top-left `mask.width() × mask.height()` region of `tile`
    /// at pixel origin `(x, y)`.
    pub fn accumulate(
        &mut self,
        tile: &TensorView<'_>,
        mask: &FeatherMask,
        (x, y): (usize, usize),
    ) -> Result<(), TensorError> {
        let t = tile.shape();
        let (mw, mh) = (mask.width(), mask.height());
        if t.n != 1 || t.c != self.shape.c {
            return Err(TensorError::shape_mismatch(
                &[1, self.shape.c, mh, mw],
                &t.dims(),
            ));
        }
        if t.h < mh || t.w < mw || y + mh > self.shape.h || x + mw > self.shape.w {
            return Err(TensorError::invalid_shape(
                &t.dims(),
                "tile footprint exceeds decoded tile or output bounds",
            ));
        }

        let mut sum = TensorViewMut::new(&mut self.sum)?;
        let mut weight = TensorViewMut::new(&mut self.weight)?;
        let wx = mask.columns();
        for c in 0..t.c {
            for (row, &wy) in mask.rows().iter().enumerate() {
                let src = tile.row(0, c, row, 0, mw);
                let dst = sum.row_mut(0, c, y + row, x, mw);
                for ((d, &s), &w) in dst.iter_mut().zip(src).zip(wx) {
                    *d += s * w * wy;
                }
                let dst = weight.row_mut(0, c, y + row, x, mw);
                for (d, &w) in dst.iter_mut().zip(wx) {
                    *d += w * wy;
                }
            }
        }
        Ok(())
    }

    /// Accumulated weight at `(c, y, x)`.
    pub fn weight_at(&self, c: usize, y: usize, x: usize) -> Option<f32> {
        self.shape
            .contains(0, c, y, x)
            .then(|| self.weight.as_slice()[self.shape.offset(0, c, y, x)])
    }

    /// Weight buffer.
    pub fn weights(&self) -> &Tensor {
        &self.weight
    }

    /// Normalizes into the final image and returns the weight buffer to
    /// `pool`.
    pub fn resolve(self, pool: &mut TensorPool) -> Tensor {
        let Self {
            mut sum, weight, ..
        } = self;
        for (s, &w) in sum.as_mut_slice().iter_mut().zip(weight.as_slice()) {
            if w > 0.0 {
                *s /= w;
            }
        }
        pool.release(weight);
        sum
    }

    /// Returns both buffers to `pool` without resolving.
    pub fn release(self, pool: &mut TensorPool) {
        pool.release(self.sum);
        pool.release(self.weight);
    }
}
