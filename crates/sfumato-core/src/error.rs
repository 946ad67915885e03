//! Error types for tensor operations.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use thiserror::Error;

/// Errors raised by tensor construction and elementwise operations.
///
/// Elementwise operations never broadcast: operands with different dims are
/// rejected with [`TensorError::ShapeMismatch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    /// Two tensors passed to an elementwise operation have different dims.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// Dims of the left-hand (or destination) operand.
        expected: Vec<usize>,
        /// Dims of the offending operand.
        found: Vec<usize>,
    },

    /// A flat buffer does not hold exactly `product(dims)` elements.
    #[error("data length {len} does not match dims {dims:?} ({expected} elements)")]
    DataLength {
        /// Requested dims.
        dims: Vec<usize>,
        /// Element count implied by the dims.
        expected: usize,
        /// Element count actually supplied.
        len: usize,
    },

    /// The dims are not usable for the requested view or operation.
    #[error("invalid shape {dims:?}: {reason}")]
    InvalidShape {
        /// Offending dims.
        dims: Vec<usize>,
        /// What was expected instead.
        reason: &'static str,
    },
}

impl TensorError {
    /// Create a shape mismatch error from two dim slices.
    pub fn shape_mismatch(expected: &[usize], found: &[usize]) -> Self {
        TensorError::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// Create an invalid shape error.
    pub fn invalid_shape(dims: &[usize], reason: &'static str) -> Self {
        TensorError::InvalidShape {
            dims: dims.to_vec(),
            reason,
        }
    }
}
