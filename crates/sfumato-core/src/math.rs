//! Numeric helpers shared by schedules, schedulers, and the decoder.
//!
//! All functions are allocation-free and `no_std`, using `libm` for
//! transcendental functions.

use libm::{cos, exp, log, pow, sqrtf};

/// Linear interpolation: `a + t * (b - a)`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// `x^y` in double precision.
#[inline]
pub fn powd(x: f64, y: f64) -> f64 {
    pow(x, y)
}

/// Natural logarithm in double precision.
#[inline]
pub fn ln(x: f64) -> f64 {
    log(x)
}

/// `e^x` in double precision.
#[inline]
pub fn expd(x: f64) -> f64 {
    exp(x)
}

/// Cosine in double precision.
#[inline]
pub fn cosd(x: f64) -> f64 {
    cos(x)
}

/// Single-precision square root.
#[inline]
pub fn sqrt(x: f32) -> f32 {
    sqrtf(x)
}

/// Normalized position of step `i` in `0..steps`, in `[0, 1]`.
///
/// A single-step run sits at `t = 0`.
#[inline]
pub fn step_fraction(i: usize, steps: usize) -> f64 {
    if steps <= 1 {
        0.0
    } else {
        i as f64 / (steps - 1) as f64
    }
}

/// Index of the first NaN or infinite value, if any.
///
/// ```rust
/// use sfumato_core::math::first_non_finite;
///
/// assert_eq!(first_non_finite(&[0.0, 1.0, f32::NAN, f32::INFINITY]), Some(2));
/// assert_eq!(first_non_finite(&[0.0, 1.0]), None);
/// ```
#[inline]
pub fn first_non_finite(data: &[f32]) -> Option<usize> {
    data.iter().position(|v| !v.is_finite())
}
