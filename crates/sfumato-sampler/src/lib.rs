//! Sfumato Sampler - noise schedules, schedulers, and the denoising loop
//!
//! This crate turns a denoiser (an external noise-prediction model) into an
//! image latent:
//!
//! - [`NoiseSchedule`] - Karras, log-linear, exponential-cosine, and discrete
//!   sigma curves with matching timesteps
//! - [`BetaSchedule`] - Training-time betas and cumulative alphas
//! - [`Scheduler`] - Euler, heun-lite, LMS, DPM++ 2M SDE, and DDPM steppers
//!   selected by [`SamplerKind`]
//! - [`SchedulerState`] - Per-generation history threaded through `step`
//! - [`GuidanceCompositor`] - Classifier-free guidance
//! - [`Sampler`] - The full loop with cancellation and progress reporting
//!
//! ## Example
//!
//! ```rust
//! use sfumato_core::{DType, Tensor, TensorPool};
//! use sfumato_sampler::{
//!     CancelToken, Conditioning, SampleOptions, Sampler, SamplerKind, Scheduler, noise,
//! };
//!
//! let mut scheduler = Scheduler::from_kind(SamplerKind::EulerKarras);
//! scheduler.generate_timesteps(8).unwrap();
//! let mut sampler = Sampler::new(scheduler, TensorPool::new());
//!
//! let latent = noise::gaussian(DType::F32, &[1, 4, 8, 8], 42, sampler.pool_mut());
//! let prompt = Tensor::zeros(DType::F32, &[1, 77, 16]);
//! let mut denoiser = |x: &Tensor, _t: f32, _c: &Tensor| -> Result<Tensor, ()> {
//!     Ok(Tensor::zeros(DType::F32, x.dims()))
//! };
//!
//! let outcome = sampler
//!     .run(
//!         &mut denoiser,
//!         latent,
//!         &Conditioning::positive(prompt),
//!         &SampleOptions::default(),
//!         &CancelToken::new(),
//!         |_| {},
//!     )
//!     .unwrap();
//! assert_eq!(outcome.completed_steps, 8);
//! ```

pub mod beta;
pub mod error;
pub mod guidance;
pub mod noise;
pub mod sampler;
pub mod schedule;
pub mod scheduler;

pub use beta::BetaSchedule;
pub use error::SamplerError;
pub use guidance::{DEFAULT_GUIDANCE_SCALE, GuidanceCompositor, composite, split_batch};
pub use sampler::{
    Conditioning, Denoiser, RunError, SampleOptions, SampleOutcome, Sampler, StepProgress,
};
pub use schedule::{NoiseSchedule, ScheduleKind, SigmaSchedule};
pub use scheduler::{
    Algorithm, DEFAULT_ETA, DEFAULT_LMS_ORDER, MAX_LMS_ORDER, Phase, SamplerKind, Scheduler,
    SchedulerState,
};
pub use sfumato_core::CancelToken;
