//! Error types for schedule generation and stepping.

use sfumato_core::TensorError;
use thiserror::Error;

/// Errors raised by noise schedules and schedulers.
///
/// All variants are programmer or configuration errors and are fatal for the
/// generation that raised them. Cancellation is not an error; see
/// [`SampleOutcome`](crate::SampleOutcome).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    /// A tensor operation failed (most often a shape mismatch).
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// `step` was called out of order, past the last step, or before
    /// `generate_timesteps`.
    #[error("step index {index} is invalid for a schedule of {steps} steps")]
    InvalidStepIndex {
        /// Requested step index.
        index: usize,
        /// Steps in the prepared schedule (0 when none is prepared).
        steps: usize,
    },

    /// Schedule parameters cannot produce a valid sigma curve.
    #[error("degenerate schedule: {0}")]
    DegenerateSchedule(String),
}
