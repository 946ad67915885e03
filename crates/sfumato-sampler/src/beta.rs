//! Training-time beta schedule.
//!
//! The denoiser was trained against a fixed variance-preserving schedule of
//! per-timestep betas. Two consumers need it at inference time: the DDPM
//! scheduler (which steps in ᾱ/β space) and the discrete sigma schedule
//! (which reads the training sigmas at the chosen timesteps).
//!
//! ```text
//! β_i  = (√β_start + i/(T−1) · (√β_end − √β_start))²     scaled-linear
//! ᾱ_t  = Π_{i ≤ t} (1 − β_i)
//! σ_t  = √((1 − ᾱ_t) / ᾱ_t)
//! ```

use sfumato_core::math::lerp;

/// Default number of training timesteps.
pub const DEFAULT_TRAIN_TIMESTEPS: u32 = 1000;
/// Default first beta of the scaled-linear schedule.
pub const DEFAULT_BETA_START: f64 = 0.00085;
/// Default last beta of the scaled-linear schedule.
pub const DEFAULT_BETA_END: f64 = 0.012;

/// Scaled-linear training beta schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaSchedule {
    /// First beta.
    pub beta_start: f64,
    /// Last beta.
    pub beta_end: f64,
    /// Number of training timesteps (`T`).
    pub train_timesteps: u32,
}

impl BetaSchedule {
    /// Creates a schedule.
    pub fn new(beta_start: f64, beta_end: f64, train_timesteps: u32) -> Self {
        Self {
            beta_start,
            beta_end,
            train_timesteps,
        }
    }

    /// Beta at training timestep `i`.
    pub fn beta(&self, i: u32) -> f64 {
        let t = if self.train_timesteps <= 1 {
            0.0
        } else {
            f64::from(i) / f64::from(self.train_timesteps - 1)
        };
        let root = lerp(self.beta_start.sqrt(), self.beta_end.sqrt(), t);
        root * root
    }

    /// Cumulative alpha product `ᾱ_t` for every training timestep.
    pub fn alphas_cumprod(&self) -> Vec<f64> {
        let mut acc = 1.0;
        (0..self.train_timesteps)
            .map(|i| {
                acc *= 1.0 - self.beta(i);
                acc
            })
            .collect()
    }

    /// Training sigma for every timestep, `√((1 − ᾱ_t) / ᾱ_t)`.
    pub fn training_sigmas(&self) -> Vec<f64> {
        self.alphas_cumprod()
            .into_iter()
            .map(|a| ((1.0 - a) / a).sqrt())
            .collect()
    }
}

impl Default for BetaSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_BETA_START, DEFAULT_BETA_END, DEFAULT_TRAIN_TIMESTEPS)
    }
}
