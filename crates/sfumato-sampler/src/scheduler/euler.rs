//! Euler (first-order) update.
//!
//! Given predicted noise `eps` at noise level `σ`:
//!
//! ```text
//! x0     = x − σ·eps
//! d      = (x − x0) / σ = eps
//! x_next = x + d·(σ_next − σ)
//! ```
//!
//! The derivative reduces to `eps` exactly, so the update never divides by
//! `σ` and a perfect prediction (`eps == 0`) leaves the sample unchanged.

use sfumato_core::{Tensor, TensorError};

/// Applies one Euler update in place.
pub(crate) fn step(
    sample: &mut Tensor,
    eps: &Tensor,
    sigma: f32,
    sigma_next: f32,
) -> Result<(), TensorError> {
    sample.add_scaled(eps, sigma_next - sigma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfumato_core::DType;

    #[test]
    fn zero_prediction_is_fixed_point() {
        let mut x = Tensor::from_vec(DType::F32, &[4], vec![0.3, -1.2, 2.0, 0.0]).unwrap();
        let before = x.clone();
        let eps = Tensor::zeros(DType::F32, &[4]);
        step(&mut x, &eps, 14.6, 9.1).unwrap();
        assert_eq!(x, before);
    }

    #[test]
    fn moves_along_eps() {
        let mut x = Tensor::full(DType::F32, &[2], 1.0);
        let eps = Tensor::full(DType::F32, &[2], 0.5);
        step(&mut x, &eps, 2.0, 1.0).unwrap();
        assert!(x.as_slice().iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }
}
