//! Linear multistep (Adams–Bashforth) update.
//!
//! Keeps the last `order` derivatives and combines them with fixed
//! Adams–Bashforth weights (most recent first):
//!
//! | order | weights |
//! |-------|---------|
//! | 1 | `1` |
//! | 2 | `3/2, −1/2` |
//! | 3 | `23/12, −16/12, 5/12` |
//! | 4 | `55/24, −59/24, 37/24, −9/24` |
//!
//! Until enough history exists the effective order is the history length, so
//! an order-4 run uses orders 1, 2, 3 for its first three steps.

use sfumato_core::{Tensor, TensorPool};

use super::state::{History, SchedulerState};
use crate::error::SamplerError;

/// Highest supported order.
pub const MAX_LMS_ORDER: usize = 4;

/// Adams–Bashforth weights for `order` (1..=4), most recent derivative first.
pub fn coefficients(order: usize) -> &'static [f32] {
    const C1: [f32; 1] = [1.0];
    const C2: [f32; 2] = [3.0 / 2.0, -1.0 / 2.0];
    const C3: [f32; 3] = [23.0 / 12.0, -16.0 / 12.0, 5.0 / 12.0];
    const C4: [f32; 4] = [55.0 / 24.0, -59.0 / 24.0, 37.0 / 24.0, -9.0 / 24.0];
    match order {
        0 | 1 => &C1,
        2 => &C2,
        3 => &C3,
        _ => &C4,
    }
}

/// Applies one LMS update in place.
pub(crate) fn step(
    state: &mut SchedulerState,
    sample: &mut Tensor,
    eps: &Tensor,
    sigma: f32,
    sigma_next: f32,
    order: usize,
    pool: &mut TensorPool,
) -> Result<(), SamplerError> {
    let mismatch = state.mismatch();
    let History::Derivatives(derivatives) = &mut state.history else {
        return Err(mismatch);
    };

    sample.check_same_shape(eps)?;
    derivatives.push_back(pool.acquire_copy(eps));
    while derivatives.len() > order.max(1) {
        if let Some(oldest) = derivatives.pop_front() {
            pool.release(oldest);
        }
    }

    let effective = derivatives.len();
    let dt = sigma_next - sigma;
    for (weight, d) in coefficients(effective).iter().zip(derivatives.iter().rev()) {
        sample.add_scaled(d, dt * weight)?;
    }
    state.last_order = effective;
    Ok(())
}
