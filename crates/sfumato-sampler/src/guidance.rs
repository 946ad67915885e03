//! Classifier-free guidance.
//!
//! ```text
//! guided = neg + s·(pos − neg) = (1 − s)·neg + s·pos
//! ```
//!
//! At `s == 1` the result is exactly `pos`, so the driver skips the
//! unconditional denoiser call entirely.

use sfumato_core::{Tensor, TensorError, TensorPool};

/// Default guidance scale.
pub const DEFAULT_GUIDANCE_SCALE: f32 = 7.5;

/// Combines conditional and unconditional noise predictions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceCompositor {
    scale: f32,
}

impl GuidanceCompositor {
    /// Creates a compositor with guidance scale `scale`.
    pub fn new(scale: f32) -> Self {
        Self { scale }
    }

    /// Guidance scale.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// True when the unconditional prediction affects the result.
    pub fn needs_unconditional(&self) -> bool {
        self.scale != 1.0
    }

    /// Returns a pooled tensor holding the guided prediction.
    pub fn composite(
        &self,
        neg: &Tensor,
        pos: &Tensor,
        pool: &mut TensorPool,
    ) -> Result<Tensor, TensorError> {
        neg.check_same_shape(pos)?;
        let mut out = pool.acquire_copy(neg);
        self.apply(&mut out, pos)?;
        Ok(out)
    }

    /// Writes the guided prediction into `neg`'s buffer and returns it.
    pub fn composite_in_place(&self, mut neg: Tensor, pos: &Tensor) -> Result<Tensor, TensorError> {
        self.apply(&mut neg, pos)?;
        Ok(neg)
    }

    fn apply(&self, neg: &mut Tensor, pos: &Tensor) -> Result<(), TensorError> {
        if self.needs_unconditional() {
            neg.blend(1.0 - self.scale, pos, self.scale)?;
            neg.quantize();
        } else {
            neg.copy_from(pos)?;
        }
        Ok(())
    }
}

impl Default for GuidanceCompositor {
    fn default() -> Self {
        Self::new(DEFAULT_GUIDANCE_SCALE)
    }
}

/// One-shot guidance into a pooled tensor.
pub fn composite(
    neg: &Tensor,
    pos: &Tensor,
    scale: f32,
    pool: &mut TensorPool,
) -> Result<Tensor, TensorError> {
    GuidanceCompositor::new(scale).composite(neg, pos, pool)
}

/// Splits a batch-of-two prediction `[2, …]` into `(neg, pos)`.
///
/// Both halves are pooled tensors with a leading batch dim of 1.
pub fn split_batch(batch: &Tensor, pool: &mut TensorPool) -> Result<(Tensor, Tensor), TensorError> {
    let dims = batch.dims();
    if dims.first() != Some(&2) {
        return Err(TensorError::invalid_shape(
            dims,
            "guidance batch must have a leading dim of 2",
        ));
    }
    let mut half_dims = dims.to_vec();
    half_dims[0] = 1;
    let half = batch.len() / 2;

    let mut neg = pool.acquire(batch.dtype(), &half_dims);
    let mut pos = pool.acquire(batch.dtype(), &half_dims);
    neg.as_mut_slice().copy_from_slice(&batch.as_slice()[..half]);
    pos.as_mut_slice().copy_from_slice(&batch.as_slice()[half..]);
    Ok((neg, pos))
}
