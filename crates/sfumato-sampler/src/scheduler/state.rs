//! Per-generation scheduler state.
//!
//! Multi-step methods remember earlier model outputs. That memory lives in a
//! [`SchedulerState`] owned by the call site and threaded through
//! [`Scheduler::step`](super::Scheduler::step) by `&mut`, never inside the
//! scheduler itself. A fresh state comes from
//! [`Scheduler::begin`](super::Scheduler::begin); one state serves exactly one
//! generation and must be [`reset`](SchedulerState::reset) before reuse.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sfumato_core::{Tensor, TensorPool};

use super::Algorithm;
use crate::error::SamplerError;

/// Position of a state in the stepping state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No step taken yet.
    Ready,
    /// The next call to `step` must use this index.
    Stepping(usize),
    /// All steps taken.
    Done,
}

/// Variant-specific history.
#[derive(Debug)]
pub(crate) enum History {
    /// Single-step methods (Euler, DDPM).
    Stateless,
    /// Previous model output and the step size it was applied with
    /// (Heun, DPM++ 2M).
    Previous(Option<(Tensor, f32)>),
    /// Trailing derivatives, oldest first (LMS).
    Derivatives(VecDeque<Tensor>),
}

impl History {
    fn len(&self) -> usize {
        match self {
            History::Stateless => 0,
            History::Previous(prev) => usize::from(prev.is_some()),
            History::Derivatives(d) => d.len(),
        }
    }

    fn drain_into(&mut self, pool: Option<&mut TensorPool>) {
        let drained: Vec<Tensor> = match self {
            History::Stateless => Vec::new(),
            History::Previous(prev) => prev.take().map(|(t, _)| t).into_iter().collect(),
            History::Derivatives(d) => d.drain(..).collect(),
        };
        if let Some(pool) = pool {
            pool.release_all(drained);
        }
    }
}

/// History and cursor for one generation.
#[derive(Debug)]
pub struct SchedulerState {
    pub(crate) algorithm: Algorithm,
    pub(crate) cursor: usize,
    pub(crate) steps: usize,
    pub(crate) history: History,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) last_order: usize,
    seed: u64,
}

impl SchedulerState {
    pub(crate) fn new(algorithm: Algorithm, steps: usize, history: History, seed: u64) -> Self {
        Self {
            algorithm,
            cursor: 0,
            steps,
            history,
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_order: 0,
            seed,
        }
    }

    /// Integration rule this state was created for.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// True when this state can drive a scheduler using `algorithm`.
    ///
    /// Options such as the LMS order or η may differ; the history layout
    /// may not.
    pub fn fits(&self, algorithm: Algorithm) -> bool {
        core::mem::discriminant(&self.algorithm) == core::mem::discriminant(&algorithm)
    }

    /// Error for a state whose history does not match the stepping rule.
    pub(crate) fn mismatch(&self) -> SamplerError {
        SamplerError::InvalidStepIndex {
            index: self.cursor,
            steps: self.steps,
        }
    }

    /// Index the next `step` call must use.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Steps in the schedule this state was created for.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Current state machine position.
    pub fn phase(&self) -> Phase {
        if self.cursor >= self.steps {
            Phase::Done
        } else if self.cursor == 0 {
            Phase::Ready
        } else {
            Phase::Stepping(self.cursor)
        }
    }

    /// True once every step has been taken.
    pub fn is_done(&self) -> bool {
        self.cursor >= self.steps
    }

    /// Number of model outputs currently remembered.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Integration order used by the most recent step (0 before any step).
    ///
    /// Single-step methods report 1; LMS reports its warm-up order.
    pub fn last_order(&self) -> usize {
        self.last_order
    }

    /// Seed of the noise stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Clears history, rewinds the cursor, and reseeds the noise stream.
    pub fn reset(&mut self) {
        self.history.drain_into(None);
        self.rewind();
    }

    /// Like [`reset`](Self::reset), returning remembered tensors to `pool`.
    pub fn reset_into(&mut self, pool: &mut TensorPool) {
        self.history.drain_into(Some(pool));
        self.rewind();
    }

    /// Returns remembered tensors to `pool` without rewinding.
    pub fn release_history(&mut self, pool: &mut TensorPool) {
        self.history.drain_into(Some(pool));
    }

    fn rewind(&mut self) {
        self.cursor = 0;
        self.last_order = 0;
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfumato_core::DType;

    #[test]
    fn phase_follows_cursor() {
        let mut s = SchedulerState::new(Algorithm::Euler, 3, History::Stateless, 0);
        assert_eq!(s.phase(), Phase::Ready);
        s.cursor = 1;
        assert_eq!(s.phase(), Phase::Stepping(1));
        s.cursor = 3;
        assert_eq!(s.phase(), Phase::Done);
        assert!(s.is_done());
    }

    #[test]
    fn reset_into_returns_history_to_pool() {
        let mut pool = TensorPool::new();
        let mut d = VecDeque::new();
        d.push_back(Tensor::zeros(DType::F32, &[1, 4, 2, 2]));
        d.push_back(Tensor::zeros(DType::F32, &[1, 4, 2, 2]));
        let mut s = SchedulerState::new(Algorithm::Lms { order: 4 }, 10, History::Derivatives(d), 7);
        s.cursor = 2;
        s.last_order = 2;

        s.reset_into(&mut pool);
        assert_eq!(s.history_len(), 0);
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.last_order(), 0);
        assert_eq!(pool.pooled(DType::F32, &[1, 4, 2, 2]), 2);
    }

    #[test]
    fn fits_ignores_options_but_not_rule() {
        let history = History::Derivatives(VecDeque::new());
        let s = SchedulerState::new(Algorithm::Lms { order: 4 }, 5, history, 0);
        assert!(s.fits(Algorithm::Lms { order: 2 }));
        assert!(!s.fits(Algorithm::Heun));
        assert!(!s.fits(Algorithm::Euler));
    }

    #[test]
    fn reset_reseeds_noise_stream() {
        use rand::Rng;
        let mut s = SchedulerState::new(Algorithm::Ddpm, 4, History::Stateless, 42);
        let first: u64 = s.rng.r#gen();
        s.reset();
        let again: u64 = s.rng.r#gen();
        assert_eq!(first, again);
    }
}
