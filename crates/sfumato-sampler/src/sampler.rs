//! The denoising loop.
//!
//! [`Sampler::run`] drives a prepared [`Scheduler`] against an external
//! [`Denoiser`]:
//!
//! ```text
//! x = scale_initial_noise(noise)
//! for i in 0..steps:
//!     cancelled?            → stop, return x
//!     input = scale_model_input(x, i)
//!     pos   = denoiser(input, t_i, positive)
//!     neg   = denoiser(input, t_i, negative)     only when guidance needs it
//!     eps   = guide(neg, pos)
//!     x     = step(eps, x, i)
//! ```
//!
//! Scratch tensors return to the sampler's [`TensorPool`] every step, so a
//! steady-state loop performs no new allocations.

use sfumato_core::math::first_non_finite;
use sfumato_core::{CancelToken, Tensor, TensorError, TensorPool};
use thiserror::Error;

use crate::error::SamplerError;
use crate::guidance::{DEFAULT_GUIDANCE_SCALE, GuidanceCompositor};
use crate::scheduler::Scheduler;

/// External noise-prediction model.
///
/// Implementations run the network forward pass; the sampler only sees
/// tensors. Errors are passed through unchanged in [`RunError::Denoiser`].
pub trait Denoiser {
    /// Failure type of the model call.
    type Error;

    /// Predicts the noise in `latent` at `timestep` under `conditioning`.
    ///
    /// The returned tensor must have `latent`'s shape.
    fn predict(
        &mut self,
        latent: &Tensor,
        timestep: f32,
        conditioning: &Tensor,
    ) -> Result<Tensor, Self::Error>;
}

impl<F, E> Denoiser for F
where
    F: FnMut(&Tensor, f32, &Tensor) -> Result<Tensor, E>,
{
    type Error = E;

    fn predict(&mut self, latent: &Tensor, timestep: f32, conditioning: &Tensor) -> Result<Tensor, E> {
        self(latent, timestep, conditioning)
    }
}

/// Text conditioning for one generation.
#[derive(Debug, Clone)]
pub struct Conditioning {
    /// Prompt embedding.
    pub positive: Tensor,
    /// Negative-prompt embedding. `None` disables guidance.
    pub negative: Option<Tensor>,
}

impl Conditioning {
    /// Conditioning without a negative prompt.
    pub fn positive(positive: Tensor) -> Self {
        Self {
            positive,
            negative: None,
        }
    }

    /// Conditioning with both prompts.
    pub fn guided(positive: Tensor, negative: Tensor) -> Self {
        Self {
            positive,
            negative: Some(negative),
        }
    }
}

/// Per-run options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOptions {
    /// Classifier-free guidance scale.
    pub guidance_scale: f32,
    /// Seed for stochastic schedulers.
    pub seed: u64,
    /// Scan every model output for NaN/Inf and log the first offender.
    pub nan_check: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            seed: 0,
            nan_check: false,
        }
    }
}

/// Progress report after a completed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepProgress {
    /// Zero-based index of the completed step.
    pub step: usize,
    /// Total steps.
    pub steps: usize,
    /// Sigma the step started from.
    pub sigma: f32,
    /// Timestep handed to the denoiser.
    pub timestep: f32,
}

/// Result of a run. Cancellation is reported here, not as an error.
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    /// Last fully produced latent.
    pub latent: Tensor,
    /// Steps completed.
    pub completed_steps: usize,
    /// True when the run stopped early on request.
    pub cancelled: bool,
}

/// Failure of a sampling run.
#[derive(Debug, Error)]
pub enum RunError<E> {
    /// Scheduler or tensor failure.
    #[error(transparent)]
    Sampler(#[from] SamplerError),

    /// The denoiser failed; its error is preserved.
    #[error("denoiser failed: {0}")]
    Denoiser(E),
}

impl<E> From<TensorError> for RunError<E> {
    fn from(err: TensorError) -> Self {
        RunError::Sampler(SamplerError::Tensor(err))
    }
}

/// Scheduler plus the pool its scratch tensors cycle through.
#[derive(Debug)]
pub struct Sampler {
    scheduler: Scheduler,
    pool: TensorPool,
}

impl Sampler {
    /// Creates a sampler. `scheduler` must already be prepared.
    pub fn new(scheduler: Scheduler, pool: TensorPool) -> Self {
        Self { scheduler, pool }
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The scheduler, mutably (to regenerate timesteps between runs).
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// The tensor pool.
    pub fn pool(&self) -> &TensorPool {
        &self.pool
    }

    /// The tensor pool, mutably.
    pub fn pool_mut(&mut self) -> &mut TensorPool {
        &mut self.pool
    }

    /// Splits into scheduler and pool.
    pub fn into_parts(self) -> (Scheduler, TensorPool) {
        (self.scheduler, self.pool)
    }

    /// Runs the full denoising loop from unit-variance `noise`.
    pub fn run<D: Denoiser>(
        &mut self,
        denoiser: &mut D,
        noise: Tensor,
        conditioning: &Conditioning,
        options: &SampleOptions,
        cancel: &CancelToken,
        mut progress: impl FnMut(StepProgress),
    ) -> Result<SampleOutcome, RunError<D::Error>> {
        let scheduler = &self.scheduler;
        let pool = &mut self.pool;

        let mut state = scheduler.begin(options.seed)?;
        let steps = scheduler.steps();
        let guidance = GuidanceCompositor::new(options.guidance_scale);
        let negative = conditioning
            .negative
            .as_ref()
            .filter(|_| guidance.needs_unconditional());

        tracing::info!(
            algorithm = scheduler.algorithm().as_str(),
            steps,
            guided = negative.is_some(),
            seed = options.seed,
            "sampling started"
        );

        let mut latent = scheduler.scale_initial_noise(noise)?;
        let mut completed_steps = 0;
        let mut cancelled = false;

        for i in 0..steps {
            if cancel.is_cancelled() {
                cancelled = true;
                tracing::info!(step = i, steps, "sampling cancelled");
                break;
            }

            let timestep = scheduler
                .timestep(i)
                .ok_or(SamplerError::InvalidStepIndex { index: i, steps })?;
            let sigma = scheduler.sigma(i).unwrap_or_default();
            let input = scheduler.scale_model_input(&latent, i, pool)?;

            let pos = denoiser
                .predict(&input, timestep, &conditioning.positive)
                .map_err(RunError::Denoiser)?;
            let eps = match negative {
                Some(neg_cond) => {
                    let neg = denoiser
                        .predict(&input, timestep, neg_cond)
                        .map_err(RunError::Denoiser)?;
                    let guided = guidance.composite_in_place(neg, &pos)?;
                    pool.release(pos);
                    guided
                }
                None => pos,
            };
            pool.release(input);

            if options.nan_check
                && let Some(index) = first_non_finite(eps.as_slice())
            {
                tracing::warn!(step = i, index, "non-finite value in model output");
            }

            latent = scheduler.step(&mut state, &eps, latent, i, pool)?;
            pool.release(eps);
            completed_steps += 1;

            progress(StepProgress {
                step: i,
                steps,
                sigma,
                timestep,
            });
        }

        state.release_history(pool);
        tracing::info!(completed_steps, cancelled, "sampling finished");

        Ok(SampleOutcome {
            latent,
            completed_steps,
            cancelled,
        })
    }
}
