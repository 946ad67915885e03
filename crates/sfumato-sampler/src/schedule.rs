//! Noise-level (sigma) schedules.
//!
//! A [`NoiseSchedule`] is a pure function from a step count to a
//! [`SigmaSchedule`]: `steps + 1` strictly decreasing sigmas ending in a single
//! `0`, plus the `steps` integer timesteps handed to the denoiser.
//!
//! | Kind | Curve `σ(t)`, `t = i/(steps−1)` |
//! |------|--------------------------------|
//! | [`ScheduleKind::Karras`] | `(σmax^(1/ρ) + t·(σmin^(1/ρ) − σmax^(1/ρ)))^ρ` |
//! | [`ScheduleKind::Linear`] | `exp(lerp(ln σmax, ln σmin, t))` |
//! | [`ScheduleKind::Exponential`] | `σmin + (σmax−σmin)·½·(1+cos(π·t^β))` |
//! | [`ScheduleKind::Discrete`] | training sigma at timestep `i` |
//!
//! Timestep `i` is `T − 1 − ⌊(T−1)·t⌋` for `T` training timesteps; a single
//! step sits at `t = 0`.

use core::f64::consts::PI;

use sfumato_core::math::{cosd, expd, lerp, ln, powd, step_fraction};

use crate::beta::BetaSchedule;
use crate::error::SamplerError;

/// Default lower sigma.
pub const DEFAULT_SIGMA_MIN: f64 = 0.0292;
/// Default upper sigma.
pub const DEFAULT_SIGMA_MAX: f64 = 14.6146;
/// Default Karras exponent.
pub const DEFAULT_RHO: f64 = 7.0;
/// Default exponential-cosine shape exponent.
pub const DEFAULT_BETA: f64 = 1.0;

/// Shape of the sigma curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScheduleKind {
    /// Karras power-law curve.
    #[default]
    Karras,
    /// Linear interpolation in log-sigma space.
    Linear,
    /// Cosine-shaped decay.
    Exponential,
    /// Training sigmas sampled at the chosen timesteps.
    Discrete,
}

impl ScheduleKind {
    /// All kinds, in display order.
    pub const ALL: [ScheduleKind; 4] = [
        ScheduleKind::Karras,
        ScheduleKind::Linear,
        ScheduleKind::Exponential,
        ScheduleKind::Discrete,
    ];

    /// Parses a kind from its lowercase name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "karras" => Some(ScheduleKind::Karras),
            "linear" => Some(ScheduleKind::Linear),
            "exponential" | "exp" => Some(ScheduleKind::Exponential),
            "discrete" => Some(ScheduleKind::Discrete),
            _ => None,
        }
    }

    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::Karras => "karras",
            ScheduleKind::Linear => "linear",
            ScheduleKind::Exponential => "exponential",
            ScheduleKind::Discrete => "discrete",
        }
    }
}

impl core::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sigma curve plus matching denoiser timesteps for one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaSchedule {
    sigmas: Vec<f32>,
    timesteps: Vec<u32>,
}

impl SigmaSchedule {
    /// Number of steps (`sigmas().len() - 1`).
    pub fn steps(&self) -> usize {
        self.timesteps.len()
    }

    /// All `steps + 1` sigmas, ending in `0`.
    pub fn sigmas(&self) -> &[f32] {
        &self.sigmas
    }

    /// All `steps` timesteps.
    pub fn timesteps(&self) -> &[u32] {
        &self.timesteps
    }

    /// Sigma at index `i` (`i == steps` is the trailing zero).
    pub fn sigma(&self, i: usize) -> Option<f32> {
        self.sigmas.get(i).copied()
    }

    /// Timestep at step `i`.
    pub fn timestep(&self, i: usize) -> Option<u32> {
        self.timesteps.get(i).copied()
    }

    /// First (largest) sigma.
    pub fn sigma_max(&self) -> f32 {
        self.sigmas[0]
    }
}

/// Sigma schedule generator.
///
/// # Example
///
/// ```rust
/// use sfumato_sampler::NoiseSchedule;
///
/// let schedule = NoiseSchedule::karras().generate(20).unwrap();
/// assert_eq!(schedule.sigmas().len(), 21);
/// assert!((schedule.sigma_max() - 14.6146).abs() < 1e-4);
/// assert_eq!(schedule.sigmas()[20], 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseSchedule {
    /// Curve shape.
    pub kind: ScheduleKind,
    /// Smallest non-zero sigma (ignored by [`ScheduleKind::Discrete`]).
    pub sigma_min: f64,
    /// Largest sigma (ignored by [`ScheduleKind::Discrete`]).
    pub sigma_max: f64,
    /// Karras exponent.
    pub rho: f64,
    /// Exponential-cosine shape exponent.
    pub beta: f64,
    /// Training beta schedule (timestep range, discrete sigmas).
    pub betas: BetaSchedule,
}

impl NoiseSchedule {
    /// Creates a schedule of `kind` with default parameters.
    pub fn new(kind: ScheduleKind) -> Self {
        Self {
            kind,
            sigma_min: DEFAULT_SIGMA_MIN,
            sigma_max: DEFAULT_SIGMA_MAX,
            rho: DEFAULT_RHO,
            beta: DEFAULT_BETA,
            betas: BetaSchedule::default(),
        }
    }

    /// Karras schedule with defaults.
    pub fn karras() -> Self {
        Self::new(ScheduleKind::Karras)
    }

    /// Log-linear schedule with defaults.
    pub fn linear() -> Self {
        Self::new(ScheduleKind::Linear)
    }

    /// Exponential-cosine schedule with defaults.
    pub fn exponential() -> Self {
        Self::new(ScheduleKind::Exponential)
    }

    /// Discrete training-sigma schedule with defaults.
    pub fn discrete() -> Self {
        Self::new(ScheduleKind::Discrete)
    }

    /// Sets the sigma range.
    pub fn with_sigma_range(mut self, sigma_min: f64, sigma_max: f64) -> Self {
        self.sigma_min = sigma_min;
        self.sigma_max = sigma_max;
        self
    }

    /// Sets the Karras exponent.
    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    /// Sets the exponential-cosine shape exponent.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Sets the training beta schedule.
    pub fn with_betas(mut self, betas: BetaSchedule) -> Self {
        self.betas = betas;
        self
    }

    /// Number of training timesteps.
    pub fn train_timesteps(&self) -> u32 {
        self.betas.train_timesteps
    }

    /// Checks parameters without generating anything.
    pub fn validate(&self, steps: u32) -> Result<(), SamplerError> {
        let degenerate = |msg: String| Err(SamplerError::DegenerateSchedule(msg));
        if steps < 1 {
            return degenerate("steps must be at least 1".into());
        }
        let train = self.train_timesteps();
        if train < 2 {
            return degenerate(format!("train timesteps must be at least 2, got {train}"));
        }
        if self.kind == ScheduleKind::Discrete {
            if steps > train {
                return degenerate(format!(
                    "discrete schedule supports at most {train} steps, got {steps}"
                ));
            }
            return Ok(());
        }
        if !(self.sigma_min.is_finite() && self.sigma_max.is_finite()) {
            return degenerate("sigma range must be finite".into());
        }
        if self.sigma_min <= 0.0 {
            return degenerate(format!("sigma_min must be positive, got {}", self.sigma_min));
        }
        if self.sigma_min >= self.sigma_max {
            return degenerate(format!(
                "sigma_min ({}) must be below sigma_max ({})",
                self.sigma_min, self.sigma_max
            ));
        }
        if self.kind == ScheduleKind::Karras && !(self.rho.is_finite() && self.rho > 0.0) {
            return degenerate(format!("rho must be positive, got {}", self.rho));
        }
        if self.kind == ScheduleKind::Exponential && !(self.beta.is_finite() && self.beta > 0.0) {
            return degenerate(format!("beta must be positive, got {}", self.beta));
        }
        Ok(())
    }

    /// Generates the sigma curve and timesteps for `steps` steps.
    ///
    /// Fails with `DegenerateSchedule` when the range is so narrow that
    /// neighbouring sigmas round to the same `f32`.
    pub fn generate(&self, steps: u32) -> Result<SigmaSchedule, SamplerError> {
        self.validate(steps)?;
        let n = steps as usize;
        let timesteps = self.timesteps(n);

        let mut sigmas: Vec<f32> = match self.kind {
            ScheduleKind::Discrete => {
                let training = self.betas.training_sigmas();
                timesteps.iter().map(|&t| training[t as usize] as f32).collect()
            }
            kind => (0..n)
                .map(|i| self.curve(kind, step_fraction(i, n)) as f32)
                .collect(),
        };
        if let Some(i) = sigmas.windows(2).position(|w| w[1] >= w[0]) {
            return Err(SamplerError::DegenerateSchedule(format!(
                "sigma range too narrow for {steps} steps: sigmas {i} and {} are equal in f32",
                i + 1
            )));
        }
        sigmas.push(0.0);

        tracing::debug!(
            kind = self.kind.as_str(),
            steps,
            sigma_max = sigmas[0],
            sigma_last = sigmas[n - 1],
            "noise schedule generated"
        );

        Ok(SigmaSchedule { sigmas, timesteps })
    }

    fn timesteps(&self, n: usize) -> Vec<u32> {
        let last = f64::from(self.train_timesteps() - 1);
        (0..n)
            .map(|i| {
                let t = step_fraction(i, n);
                (last - (last * t).floor()) as u32
            })
            .collect()
    }

    fn curve(&self, kind: ScheduleKind, t: f64) -> f64 {
        match kind {
            ScheduleKind::Karras => {
                let max_inv_rho = powd(self.sigma_max, 1.0 / self.rho);
                let min_inv_rho = powd(self.sigma_min, 1.0 / self.rho);
                powd(lerp(max_inv_rho, min_inv_rho, t), self.rho)
            }
            ScheduleKind::Linear => expd(lerp(ln(self.sigma_max), ln(self.sigma_min), t)),
            ScheduleKind::Exponential => {
                self.sigma_min
                    + (self.sigma_max - self.sigma_min)
                        * 0.5
                        * (1.0 + cosd(PI * powd(t, self.beta)))
            }
            ScheduleKind::Discrete => unreachable!("discrete sigmas come from the beta schedule"),
        }
    }
}

impl Default for NoiseSchedule {
    fn default() -> Self {
        Self::karras()
    }
}
