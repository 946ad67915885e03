//! DPM++ 2M SDE update.
//!
//! Second-order multistep in sigma space with optional ancestral noise.
//!
//! With `η > 0` the step to `σ_next` is split into a deterministic part down
//! to `σ_down` and fresh Gaussian noise of standard deviation `σ_up`:
//!
//! ```text
//! σ_up²  = η²·(σ_next² − σ_next²·(σ_next/σ)²)      clamped to σ_next²
//! σ_down = √(σ_next² − σ_up²)
//! ```
//!
//! Once a previous derivative exists the deterministic part extrapolates
//! linearly between the two (variable-step Adams–Bashforth 2):
//!
//! ```text
//! h = σ_down − σ,  r = h / h_prev
//! d' = (1 + r/2)·d − (r/2)·d_prev
//! ```
//!
//! The final step (`σ_next == 0`) is always first order.

use rand_distr::{Distribution, StandardNormal};
use sfumato_core::{Tensor, TensorPool};

use super::state::{History, SchedulerState};
use crate::error::SamplerError;

/// Splits a step into its deterministic target and noise amplitude.
///
/// Returns `(σ_down, σ_up)`.
pub fn ancestral_split(sigma: f32, sigma_next: f32, eta: f32) -> (f32, f32) {
    if eta <= 0.0 || sigma_next <= 0.0 || sigma <= 0.0 {
        return (sigma_next, 0.0);
    }
    let ratio = sigma_next / sigma;
    let variance = eta * eta * (sigma_next * sigma_next - sigma_next * sigma_next * ratio * ratio);
    let sigma_up = variance.max(0.0).sqrt().min(sigma_next);
    let sigma_down = (sigma_next * sigma_next - sigma_up * sigma_up).max(0.0).sqrt();
    (sigma_down, sigma_up)
}

/// Applies one DPM++ 2M SDE update in place.
pub(crate) fn step(
    state: &mut SchedulerState,
    sample: &mut Tensor,
    eps: &Tensor,
    sigma: f32,
    sigma_next: f32,
    eta: f32,
    pool: &mut TensorPool,
) -> Result<(), SamplerError> {
    sample.check_same_shape(eps)?;
    let (sigma_down, sigma_up) = ancestral_split(sigma, sigma_next, eta);
    let h = sigma_down - sigma;

    let mismatch = state.mismatch();
    let History::Previous(slot) = &mut state.history else {
        return Err(mismatch);
    };

    match slot.take() {
        Some((prev, h_prev)) if sigma_next > 0.0 && h_prev != 0.0 => {
            let half_r = 0.5 * h / h_prev;
            sample.add_scaled(eps, h * (1.0 + half_r))?;
            sample.add_scaled(&prev, -h * half_r)?;
            pool.release(prev);
            state.last_order = 2;
        }
        other => {
            if let Some((prev, _)) = other {
                pool.release(prev);
            }
            sample.add_scaled(eps, h)?;
            state.last_order = 1;
        }
    }

    if sigma_up > 0.0 {
        for v in sample.as_mut_slice() {
            let z: f32 = StandardNormal.sample(&mut state.rng);
            *v += z * sigma_up;
        }
    }

    *slot = Some((pool.acquire_copy(eps), h));
    Ok(())
}
