//! Scheduler family: one integration rule over a sigma curve.
//!
//! A [`Scheduler`] is a closed enum of algorithms paired with the
//! [`NoiseSchedule`] that drives it. The scheduler itself is immutable during
//! a generation: per-generation history lives in a [`SchedulerState`] created
//! by [`Scheduler::begin`] and threaded through [`Scheduler::step`].
//!
//! ```text
//! Uninitialized ──generate_timesteps──▶ Ready ──step(0)──▶ Stepping(1) ─ … ─▶ Done
//! ```
//!
//! # Example
//!
//! ```rust
//! use sfumato_core::{DType, Tensor, TensorPool};
//! use sfumato_sampler::{SamplerKind, Scheduler};
//!
//! let mut scheduler = Scheduler::from_kind(SamplerKind::EulerKarras);
//! scheduler.generate_timesteps(10).unwrap();
//! let mut state = scheduler.begin(0).unwrap();
//! let mut pool = TensorPool::new();
//!
//! let mut x = scheduler.scale_initial_noise(Tensor::full(DType::F32, &[1, 4, 8, 8], 1.0)).unwrap();
//! for i in 0..scheduler.steps() {
//!     let eps = Tensor::zeros(DType::F32, &[1, 4, 8, 8]);
//!     x = scheduler.step(&mut state, &eps, x, i, &mut pool).unwrap();
//! }
//! assert!(state.is_done());
//! ```

mod ddpm;
mod dpmpp;
mod euler;
mod heun;
mod lms;
mod state;

use std::collections::VecDeque;

use sfumato_core::{Tensor, TensorPool};

use crate::error::SamplerError;
use crate::schedule::{NoiseSchedule, ScheduleKind, SigmaSchedule};

pub use ddpm::{pred_original as ddpm_pred_original, renoise as ddpm_renoise};
pub use dpmpp::ancestral_split;
pub use heun::HEUN_VARIANT;
pub use lms::{MAX_LMS_ORDER, coefficients as lms_coefficients};
pub use state::{Phase, SchedulerState};

use state::History;

/// Default LMS order.
pub const DEFAULT_LMS_ORDER: usize = 4;
/// Default DPM++ SDE noise multiplier.
pub const DEFAULT_ETA: f32 = 1.0;

/// Named sampler presets, as exposed to users and config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerKind {
    /// Euler over the discrete training schedule.
    #[default]
    Euler,
    /// Euler over the Karras schedule.
    EulerKarras,
    /// Euler over the log-linear schedule.
    EulerLinear,
    /// Euler over the exponential-cosine schedule.
    EulerExponential,
    /// Heun-lite predictor-corrector over the Karras schedule.
    Heun,
    /// Fourth-order linear multistep over the discrete schedule.
    Lms,
    /// DPM++ 2M SDE over the Karras schedule.
    DpmPp2mSde,
    /// DDPM over the discrete training timesteps.
    Ddpm,
}

impl SamplerKind {
    /// All presets, in display order.
    pub const ALL: [SamplerKind; 8] = [
        SamplerKind::Euler,
        SamplerKind::EulerKarras,
        SamplerKind::EulerLinear,
        SamplerKind::EulerExponential,
        SamplerKind::Heun,
        SamplerKind::Lms,
        SamplerKind::DpmPp2mSde,
        SamplerKind::Ddpm,
    ];

    /// Parses a preset from its name. Underscores are accepted for dashes.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "euler" => Some(SamplerKind::Euler),
            "euler-karras" => Some(SamplerKind::EulerKarras),
            "euler-linear" => Some(SamplerKind::EulerLinear),
            "euler-exponential" => Some(SamplerKind::EulerExponential),
            "heun" => Some(SamplerKind::Heun),
            "lms" => Some(SamplerKind::Lms),
            "dpmpp-2m-sde" | "dpm++-2m-sde" => Some(SamplerKind::DpmPp2mSde),
            "ddpm" => Some(SamplerKind::Ddpm),
            _ => None,
        }
    }

    /// Canonical name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SamplerKind::Euler => "euler",
            SamplerKind::EulerKarras => "euler-karras",
            SamplerKind::EulerLinear => "euler-linear",
            SamplerKind::EulerExponential => "euler-exponential",
            SamplerKind::Heun => "heun",
            SamplerKind::Lms => "lms",
            SamplerKind::DpmPp2mSde => "dpmpp-2m-sde",
            SamplerKind::Ddpm => "ddpm",
        }
    }

    /// Noise schedule shape this preset uses unless overridden.
    pub const fn default_schedule(&self) -> ScheduleKind {
        match self {
            SamplerKind::Euler | SamplerKind::Lms | SamplerKind::Ddpm => ScheduleKind::Discrete,
            SamplerKind::EulerKarras | SamplerKind::Heun | SamplerKind::DpmPp2mSde => {
                ScheduleKind::Karras
            }
            SamplerKind::EulerLinear => ScheduleKind::Linear,
            SamplerKind::EulerExponential => ScheduleKind::Exponential,
        }
    }

    /// Integration rule this preset uses with default options.
    pub const fn algorithm(&self) -> Algorithm {
        match self {
            SamplerKind::Euler
            | SamplerKind::EulerKarras
            | SamplerKind::EulerLinear
            | SamplerKind::EulerExponential => Algorithm::Euler,
            SamplerKind::Heun => Algorithm::Heun,
            SamplerKind::Lms => Algorithm::Lms {
                order: DEFAULT_LMS_ORDER,
            },
            SamplerKind::DpmPp2mSde => Algorithm::DpmPp2mSde { eta: DEFAULT_ETA },
            SamplerKind::Ddpm => Algorithm::Ddpm,
        }
    }
}

impl core::fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integration rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Algorithm {
    /// First-order Euler.
    Euler,
    /// Heun-lite predictor-corrector (see [`HEUN_VARIANT`]).
    Heun,
    /// Adams–Bashforth linear multistep.
    Lms {
        /// Maximum order, `1..=4`.
        order: usize,
    },
    /// DPM++ 2M with SDE noise.
    DpmPp2mSde {
        /// Noise multiplier; `0` makes the sampler deterministic.
        eta: f32,
    },
    /// Denoising diffusion probabilistic model update.
    Ddpm,
}

impl Algorithm {
    /// Short name for logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Euler => "euler",
            Algorithm::Heun => HEUN_VARIANT,
            Algorithm::Lms { .. } => "lms",
            Algorithm::DpmPp2mSde { .. } => "dpmpp-2m-sde",
            Algorithm::Ddpm => "ddpm",
        }
    }

    /// True when model input and initial noise are scaled by sigma.
    pub const fn is_sigma_space(&self) -> bool {
        !matches!(self, Algorithm::Ddpm)
    }

    fn validate(&self) -> Result<(), SamplerError> {
        match *self {
            Algorithm::Lms { order } if !(1..=MAX_LMS_ORDER).contains(&order) => Err(
                SamplerError::DegenerateSchedule(format!(
                    "lms order must be in 1..={MAX_LMS_ORDER}, got {order}"
                )),
            ),
            Algorithm::DpmPp2mSde { eta } if !(eta.is_finite() && eta >= 0.0) => Err(
                SamplerError::DegenerateSchedule(format!("eta must be non-negative, got {eta}")),
            ),
            _ => Ok(()),
        }
    }

    fn fresh_history(&self) -> History {
        match *self {
            Algorithm::Euler | Algorithm::Ddpm => History::Stateless,
            Algorithm::Heun | Algorithm::DpmPp2mSde { .. } => History::Previous(None),
            Algorithm::Lms { order } => History::Derivatives(VecDeque::with_capacity(order)),
        }
    }
}

#[derive(Debug, Clone)]
struct Prepared {
    schedule: SigmaSchedule,
    /// `ᾱ` at each step's timestep, plus a trailing `1.0`. Empty unless DDPM.
    alphas: Vec<f32>,
}

/// A configured integration rule and its sigma schedule.
#[derive(Debug, Clone)]
pub struct Scheduler {
    algorithm: Algorithm,
    noise: NoiseSchedule,
    prepared: Option<Prepared>,
}

impl Scheduler {
    /// Creates an uninitialized scheduler.
    pub fn new(algorithm: Algorithm, noise: NoiseSchedule) -> Self {
        Self {
            algorithm,
            noise,
            prepared: None,
        }
    }

    /// Creates a scheduler for a named preset with its default schedule.
    pub fn from_kind(kind: SamplerKind) -> Self {
        Self::new(kind.algorithm(), NoiseSchedule::new(kind.default_schedule()))
    }

    /// Integration rule.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Noise schedule generator.
    pub fn noise_schedule(&self) -> &NoiseSchedule {
        &self.noise
    }

    /// Builds the sigma curve (and the ᾱ table for DDPM) for `steps` steps.
    ///
    /// Calling it again replaces the previous schedule; states from
    /// [`begin`](Self::begin) made before that are no longer valid.
    pub fn generate_timesteps(&mut self, steps: u32) -> Result<&SigmaSchedule, SamplerError> {
        self.algorithm.validate()?;
        let schedule = self.noise.generate(steps)?;

        let alphas = if self.algorithm == Algorithm::Ddpm {
            let table = self.noise.betas.alphas_cumprod();
            schedule
                .timesteps()
                .iter()
                .map(|&t| table[t as usize] as f32)
                .chain(core::iter::once(1.0))
                .collect()
        } else {
            Vec::new()
        };

        tracing::debug!(
            algorithm = self.algorithm.as_str(),
            schedule = self.noise.kind.as_str(),
            steps,
            "scheduler prepared"
        );

        let prepared = self.prepared.insert(Prepared { schedule, alphas });
        Ok(&prepared.schedule)
    }

    /// True once [`generate_timesteps`](Self::generate_timesteps) succeeded.
    pub fn is_ready(&self) -> bool {
        self.prepared.is_some()
    }

    /// Creates the state for one generation.
    ///
    /// `seed` drives the SDE noise of stochastic algorithms.
    pub fn begin(&self, seed: u64) -> Result<SchedulerState, SamplerError> {
        let prepared = self.prepared()?;
        Ok(SchedulerState::new(
            self.algorithm,
            prepared.schedule.steps(),
            self.algorithm.fresh_history(),
            seed,
        ))
    }

    /// Number of steps in the prepared schedule (0 before preparation).
    pub fn steps(&self) -> usize {
        self.prepared.as_ref().map_or(0, |p| p.schedule.steps())
    }

    /// Prepared schedule, if any.
    pub fn schedule(&self) -> Option<&SigmaSchedule> {
        self.prepared.as_ref().map(|p| &p.schedule)
    }

    /// Sigma at step `i`.
    pub fn sigma(&self, i: usize) -> Option<f32> {
        self.schedule().and_then(|s| s.sigma(i))
    }

    /// Timestep handed to the denoiser at step `i`.
    pub fn timestep(&self, i: usize) -> Option<f32> {
        self.schedule()
            .filter(|s| i < s.steps())
            .and_then(|s| s.timestep(i))
            .map(|t| t as f32)
    }

    /// Returns a pooled copy of `sample` scaled for the denoiser at step `i`.
    ///
    /// Sigma-space algorithms divide by `√(σ² + 1)`; DDPM copies unchanged.
    pub fn scale_model_input(
        &self,
        sample: &Tensor,
        i: usize,
        pool: &mut TensorPool,
    ) -> Result<Tensor, SamplerError> {
        let sigma = self.checked_sigma(i)?;
        let mut scaled = pool.acquire_copy(sample);
        if self.algorithm.is_sigma_space() {
            scaled.scale(1.0 / (sigma * sigma + 1.0).sqrt());
            scaled.quantize();
        }
        Ok(scaled)
    }

    /// Scales unit-variance noise to the first sigma (DDPM: unchanged).
    pub fn scale_initial_noise(&self, mut noise: Tensor) -> Result<Tensor, SamplerError> {
        let prepared = self.prepared()?;
        if self.algorithm.is_sigma_space() {
            noise.scale(prepared.schedule.sigma_max());
            noise.quantize();
        }
        Ok(noise)
    }

    /// Advances `sample` by one step and returns it.
    ///
    /// `i` must equal the state's cursor and be below [`steps`](Self::steps),
    /// and `state` must come from a scheduler with the same integration rule.
    /// `model_output` is the (guided) noise prediction for `sample` at step
    /// `i`. Scratch and history buffers come from and return to `pool`.
    pub fn step(
        &self,
        state: &mut SchedulerState,
        model_output: &Tensor,
        mut sample: Tensor,
        i: usize,
        pool: &mut TensorPool,
    ) -> Result<Tensor, SamplerError> {
        let prepared = self.prepared()?;
        let steps = prepared.schedule.steps();
        if i >= steps
            || i != state.cursor
            || state.steps != steps
            || !state.fits(self.algorithm)
        {
            return Err(SamplerError::InvalidStepIndex { index: i, steps });
        }
        sample.check_same_shape(model_output)?;

        let sigmas = prepared.schedule.sigmas();
        let (sigma, sigma_next) = (sigmas[i], sigmas[i + 1]);

        match self.algorithm {
            Algorithm::Euler => {
                euler::step(&mut sample, model_output, sigma, sigma_next)?;
                state.last_order = 1;
            }
            Algorithm::Heun => {
                heun::step(state, &mut sample, model_output, sigma, sigma_next, pool)?;
            }
            Algorithm::Lms { order } => {
                lms::step(state, &mut sample, model_output, sigma, sigma_next, order, pool)?;
            }
            Algorithm::DpmPp2mSde { eta } => {
                dpmpp::step(state, &mut sample, model_output, sigma, sigma_next, eta, pool)?;
            }
            Algorithm::Ddpm => {
                let (a, a_prev) = (prepared.alphas[i], prepared.alphas[i + 1]);
                ddpm::step(&mut sample, model_output, a, a_prev)?;
                state.last_order = 1;
            }
        }
        sample.quantize();
        state.cursor += 1;

        tracing::trace!(
            algorithm = self.algorithm.as_str(),
            step = i,
            sigma,
            sigma_next,
            order = state.last_order,
            "scheduler step"
        );
        Ok(sample)
    }

    /// Clears `state` for reuse, returning its history buffers to `pool`.
    pub fn reset(&self, state: &mut SchedulerState, pool: &mut TensorPool) {
        state.reset_into(pool);
        if let Some(prepared) = &self.prepared {
            state.steps = prepared.schedule.steps();
        }
        state.history = self.algorithm.fresh_history();
        state.algorithm = self.algorithm;
    }

    fn prepared(&self) -> Result<&Prepared, SamplerError> {
        self.prepared
            .as_ref()
            .ok_or(SamplerError::InvalidStepIndex { index: 0, steps: 0 })
    }

    fn checked_sigma(&self, i: usize) -> Result<f32, SamplerError> {
        let steps = self.steps();
        if i >= steps {
            return Err(SamplerError::InvalidStepIndex { index: i, steps });
        }
        Ok(self.prepared()?.schedule.sigmas()[i])
    }
}
