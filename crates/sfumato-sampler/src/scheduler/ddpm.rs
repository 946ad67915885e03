//! DDPM update in the ᾱ/β parameterization.
//!
//! With `α_t = ᾱ_t` and `β_t = 1 − ᾱ_t` at the current timestep and
//! `α_{t−1}` at the next one (`1` after the final step):
//!
//! ```text
//! pred_x0 = (x_t − √β_t·eps) / √α_t
//! x_{t−1} = √α_{t−1}·pred_x0 + √β_{t−1}·eps
//! ```

use sfumato_core::{Tensor, TensorError};

/// Reconstructs the clean sample from `x_t` and predicted noise.
#[inline]
pub fn pred_original(x_t: f32, eps: f32, alpha_prod: f32) -> f32 {
    (x_t - (1.0 - alpha_prod).sqrt() * eps) / alpha_prod.sqrt()
}

/// Re-noises a clean sample to the level given by `alpha_prod`.
#[inline]
pub fn renoise(pred_x0: f32, eps: f32, alpha_prod: f32) -> f32 {
    alpha_prod.sqrt() * pred_x0 + (1.0 - alpha_prod).sqrt() * eps
}

/// Applies one DDPM update in place.
pub(crate) fn step(
    sample: &mut Tensor,
    eps: &Tensor,
    alpha_prod: f32,
    alpha_prod_prev: f32,
) -> Result<(), TensorError> {
    sample.check_same_shape(eps)?;
    for (x, &e) in sample.as_mut_slice().iter_mut().zip(eps.as_slice()) {
        let x0 = pred_original(*x, e, alpha_prod);
        *x = renoise(x0, e, alpha_prod_prev);
    }
    Ok(())
}
