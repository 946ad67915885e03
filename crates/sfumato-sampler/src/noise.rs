//! Seeded Gaussian noise.
//!
//! Initial latents and SDE noise both draw from `ChaCha8Rng`, so a seed
//! reproduces the same image on every platform.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use sfumato_core::{DType, Tensor, TensorPool};

/// Fills `tensor` with standard-normal samples drawn from `rng`.
pub fn fill_gaussian<R: Rng + ?Sized>(tensor: &mut Tensor, rng: &mut R) {
    for v in tensor.as_mut_slice() {
        *v = rng.sample(StandardNormal);
    }
    tensor.quantize();
}

/// Returns a pooled unit-variance Gaussian tensor for `seed`.
pub fn gaussian(dtype: DType, dims: &[usize], seed: u64, pool: &mut TensorPool) -> Tensor {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut t = pool.acquire(dtype, dims);
    fill_gaussian(&mut t, &mut rng);
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_noise() {
        let mut pool = TensorPool::new();
        let a = gaussian(DType::F32, &[1, 4, 8, 8], 42, &mut pool);
        let b = gaussian(DType::F32, &[1, 4, 8, 8], 42, &mut pool);
        let c = gaussian(DType::F32, &[1, 4, 8, 8], 43, &mut pool);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn roughly_unit_variance() {
        let mut pool = TensorPool::new();
        let n = gaussian(DType::F32, &[1, 4, 64, 64], 7, &mut pool);
        assert!(n.mean().abs() < 0.05, "mean = {}", n.mean());
        assert!((n.std_dev() - 1.0).abs() < 0.05, "std = {}", n.std_dev());
    }

    #[test]
    fn f16_noise_is_rounded() {
        let mut pool = TensorPool::new();
        let n = gaussian(DType::F16, &[16], 1, &mut pool);
        for &v in n.as_slice() {
            assert_eq!(DType::F16.round(v), v);
        }
    }
}
