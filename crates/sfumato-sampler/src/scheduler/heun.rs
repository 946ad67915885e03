//! Heun-lite predictor-corrector.
//!
//! This is not textbook Heun: there is no second denoiser evaluation at the
//! predicted point. Steps alternate between two states:
//!
//! - **predictor** (even index): plain Euler update; the model output is
//!   remembered.
//! - **corrector** (odd index): the current and remembered outputs are
//!   averaged and the average drives the same Euler update.
//!
//! The averaged derivative costs one extra buffer and no extra model calls.
//! Accuracy sits between first and second order.

use sfumato_core::{Tensor, TensorPool};

use super::euler;
use super::state::{History, SchedulerState};
use crate::error::SamplerError;

/// Name used in logs and docs for this deviation from standard Heun.
pub const HEUN_VARIANT: &str = "heun-lite";

/// Applies one heun-lite update in place.
pub(crate) fn step(
    state: &mut SchedulerState,
    sample: &mut Tensor,
    eps: &Tensor,
    sigma: f32,
    sigma_next: f32,
    pool: &mut TensorPool,
) -> Result<(), SamplerError> {
    let mismatch = state.mismatch();
    let History::Previous(slot) = &mut state.history else {
        return Err(mismatch);
    };
    let dt = sigma_next - sigma;

    if state.cursor % 2 == 1
        && let Some((mut avg, _)) = slot.take()
    {
        avg.blend(0.5, eps, 0.5)?;
        let result = sample.add_scaled(&avg, dt);
        pool.release(avg);
        state.last_order = 2;
        return result.map_err(SamplerError::from);
    }

    euler::step(sample, eps, sigma, sigma_next)?;
    if let Some((old, _)) = slot.take() {
        pool.release(old);
    }
    *slot = Some((pool.acquire_copy(eps), dt));
    state.last_order = 1;
    Ok(())
}
