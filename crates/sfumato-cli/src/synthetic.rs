//! Analytic stand-ins for the denoiser and VAE decoder.
//!
//! The denoiser knows the clean latent it is steering towards, so it can
//! return the exact noise in any sample. The decoder nearest-upsamples the
//! first three latent channels. Together they exercise the whole loop
//! without model weights.

use std::convert::Infallible;

use sfumato_core::{DType, Tensor};
use sfumato_sampler::{Algorithm, Denoiser, Scheduler};
use sfumato_vae::{LATENT_SCALE, TileDecoder};

/// Clean latent: smooth per-channel gradients in `[-0.15, 0.15]`.
pub fn target_latent(dims: [usize; 4]) -> Tensor {
    let [n, c, h, w] = dims;
    let mut t = Tensor::zeros(DType::F32, &dims);
    let data = t.as_mut_slice();
    for ni in 0..n {
        for ci in 0..c {
            for y in 0..h {
                let v = y as f32 / h.max(2).saturating_sub(1) as f32;
                for x in 0..w {
                    let u = x as f32 / w.max(2).saturating_sub(1) as f32;
                    let value = match ci % 4 {
                        0 => u - 0.5,
                        1 => v - 0.5,
                        2 => 0.5 - (u + v) * 0.5,
                        _ => 0.0,
                    };
                    data[((ni * c + ci) * h + y) * w + x] = value * 0.3;
                }
            }
        }
    }
    t
}

/// Denoiser that returns the exact noise relative to a known clean latent.
pub struct AnalyticDenoiser {
    target: Tensor,
    levels: Vec<f32>,
    calls_per_step: usize,
    calls: usize,
}

impl AnalyticDenoiser {
    /// Builds a denoiser for `scheduler`'s prepared schedule.
    ///
    /// `calls_per_step` is 2 when guidance runs an unconditional pass.
    pub fn new(scheduler: &Scheduler, target: Tensor, calls_per_step: usize) -> Self {
        let levels = match scheduler.schedule() {
            Some(schedule) if scheduler.algorithm() == Algorithm::Ddpm => {
                let table = scheduler.noise_schedule().betas.alphas_cumprod();
                schedule
                    .timesteps()
                    .iter()
                    .map(|&t| {
                        let a = table[t as usize];
                        ((1.0 - a) / a).sqrt() as f32
                    })
                    .collect()
            }
            Some(schedule) => schedule.sigmas()[..schedule.steps()].to_vec(),
            None => Vec::new(),
        };
        Self {
            target,
            levels,
            calls_per_step: calls_per_step.max(1),
            calls: 0,
        }
    }
}

impl Denoiser for AnalyticDenoiser {
    type Error = Infallible;

    // Scaled sigma-space inputs and DDPM samples both satisfy
    // input·√(σ²+1) = x0 + σ·ε.
    fn predict(&mut self, latent: &Tensor, _timestep: f32, _cond: &Tensor) -> Result<Tensor, Infallible> {
        let step = self.calls / self.calls_per_step;
        self.calls += 1;
        let sigma = self.levels.get(step).copied().unwrap_or(1.0).max(f32::EPSILON);
        let c = (sigma * sigma + 1.0).sqrt();

        let mut eps = latent.clone();
        for (e, &x0) in eps.as_mut_slice().iter_mut().zip(self.target.as_slice()) {
            *e = (*e * c - x0) / sigma;
        }
        eps.quantize();
        Ok(eps)
    }
}

/// Decoder that nearest-upsamples latent channels 0..3 by 8.
pub struct UpsampleDecoder;

impl TileDecoder for UpsampleDecoder {
    type Error = Infallible;

    fn decode(&mut self, latent_tile: &Tensor) -> Result<Tensor, Infallible> {
        let &[_, c, h, w] = latent_tile.dims() else {
            return Ok(Tensor::zeros(DType::F32, &[1, 3, 0, 0]));
        };
        let (oh, ow) = (h * LATENT_SCALE, w * LATENT_SCALE);
        let src = latent_tile.as_slice();
        let mut out = Tensor::zeros(DType::F32, &[1, 3, oh, ow]);
        let data = out.as_mut_slice();
        for ch in 0..3.min(c) {
            for y in 0..oh {
                for x in 0..ow {
                    data[(ch * oh + y) * ow + x] =
                        src[(ch * h + y / LATENT_SCALE) * w + x / LATENT_SCALE];
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfumato_sampler::SamplerKind;

    #[test]
    fn target_spans_gradient() {
        let t = target_latent([1, 4, 4, 4]);
        let s = t.as_slice();
        assert!((s[0] + 0.15).abs() < 1e-6);
        assert!((s[3] - 0.15).abs() < 1e-6);
        assert!(s[48..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn denoiser_recovers_exact_noise() {
        let mut scheduler = Scheduler::from_kind(SamplerKind::EulerKarras);
        scheduler.generate_timesteps(4).unwrap();
        let sigma = scheduler.sigma(0).unwrap();
        let target = target_latent([1, 4, 2, 2]);
        let mut d = AnalyticDenoiser::new(&scheduler, target.clone(), 1);

        // x = x0 + σ·1, input = x/√(σ²+1)
        let mut input = target.clone();
        for v in input.as_mut_slice() {
            *v = (*v + sigma) / (sigma * sigma + 1.0).sqrt();
        }
        let eps = d.predict(&input, 0.0, &target).unwrap();
        assert!(eps.as_slice().iter().all(|&e| (e - 1.0).abs() < 1e-3));
    }

    #[test]
    fn decoder_upsamples_by_eight() {
        let latent = target_latent([1, 4, 2, 3]);
        let image = UpsampleDecoder.decode(&latent).unwrap();
        assert_eq!(image.dims(), &[1, 3, 16, 24]);
        assert_eq!(image.as_slice()[0], latent.as_slice()[0]);
        assert_eq!(image.as_slice()[23], latent.as_slice()[2]);
    }
}
