//! Settings validation.
//!
//! [`validate_config`] checks every field and reports all problems at once,
//! so a user fixing a config file sees the full list rather than one error
//! per run.
//!
//! # Example
//!
//! ```rust
//! use sfumato_config::{GenerationConfig, ValidationError, validate_config};
//!
//! let mut config = GenerationConfig::default();
//! assert!(validate_config(&config).is_ok());
//!
//! config.width = 500;
//! assert!(matches!(validate_config(&config), Err(ValidationError::InvalidFormat { .. })));
//! ```

use sfumato_sampler::beta::DEFAULT_TRAIN_TIMESTEPS;
use sfumato_sampler::{MAX_LMS_ORDER, SamplerKind, ScheduleKind};
use sfumato_vae::LATENT_SCALE;
use thiserror::Error;

use crate::generation::GenerationConfig;

/// Upper bound on the guidance scale.
pub const MAX_GUIDANCE_SCALE: f64 = 50.0;
/// Upper bound on the output side length in pixels.
pub const MAX_IMAGE_SIDE: u32 = 4096;
/// Upper bound on the SDE noise multiplier.
pub const MAX_ETA: f64 = 10.0;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Sampler name not recognized.
    #[error("unknown sampler: {0}")]
    UnknownSampler(String),

    /// Schedule name not recognized.
    #[error("unknown schedule: {0}")]
    UnknownSchedule(String),

    /// Value out of range.
    #[error("'{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the setting.
        param: &'static str,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value has the wrong shape (not a multiple of 8, inverted range, ...).
    #[error("invalid value for '{param}': {reason}")]
    InvalidFormat {
        /// Name of the setting.
        param: &'static str,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Parses a sampler name.
pub fn parse_sampler(name: &str) -> ValidationResult<SamplerKind> {
    SamplerKind::parse(name).ok_or_else(|| ValidationError::UnknownSampler(name.to_string()))
}

/// Parses a schedule name.
pub fn parse_schedule(name: &str) -> ValidationResult<ScheduleKind> {
    ScheduleKind::parse(name).ok_or_else(|| ValidationError::UnknownSchedule(name.to_string()))
}

fn range(errors: &mut Vec<ValidationError>, param: &'static str, value: f64, min: f64, max: f64) {
    if !(value.is_finite() && (min..=max).contains(&value)) {
        errors.push(ValidationError::OutOfRange {
            param,
            value,
            min,
            max,
        });
    }
}

fn multiple_of_latent(errors: &mut Vec<ValidationError>, param: &'static str, value: u32) {
    if value % LATENT_SCALE as u32 != 0 {
        errors.push(ValidationError::InvalidFormat {
            param,
            reason: format!("{value} is not a multiple of {LATENT_SCALE}"),
        });
    }
}

/// Validates every field of `config`.
///
/// Returns the single error directly, or [`ValidationError::Multiple`] when
/// more than one check fails.
pub fn validate_config(config: &GenerationConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if let Err(e) = parse_sampler(&config.sampler) {
        errors.push(e);
    }
    if let Some(kind) = &config.schedule.kind
        && let Err(e) = parse_schedule(kind)
    {
        errors.push(e);
    }

    range(
        &mut errors,
        "steps",
        f64::from(config.steps),
        1.0,
        f64::from(DEFAULT_TRAIN_TIMESTEPS),
    );
    range(
        &mut errors,
        "guidance_scale",
        f64::from(config.guidance_scale),
        0.0,
        MAX_GUIDANCE_SCALE,
    );

    let side = LATENT_SCALE as f64;
    range(&mut errors, "width", f64::from(config.width), side, f64::from(MAX_IMAGE_SIDE));
    range(&mut errors, "height", f64::from(config.height), side, f64::from(MAX_IMAGE_SIDE));
    range(
        &mut errors,
        "tile_size",
        f64::from(config.tile_size),
        side,
        f64::from(MAX_IMAGE_SIDE),
    );
    multiple_of_latent(&mut errors, "width", config.width);
    multiple_of_latent(&mut errors, "height", config.height);
    multiple_of_latent(&mut errors, "tile_size", config.tile_size);

    range(
        &mut errors,
        "sampler_options.lms_order",
        config.sampler_options.lms_order as f64,
        1.0,
        MAX_LMS_ORDER as f64,
    );
    range(
        &mut errors,
        "sampler_options.eta",
        f64::from(config.sampler_options.eta),
        0.0,
        MAX_ETA,
    );

    let s = &config.schedule;
    if !(s.sigma_min.is_finite() && s.sigma_min > 0.0) {
        errors.push(ValidationError::InvalidFormat {
            param: "schedule.sigma_min",
            reason: format!("{} must be positive", s.sigma_min),
        });
    } else if !(s.sigma_max.is_finite() && s.sigma_min < s.sigma_max) {
        errors.push(ValidationError::InvalidFormat {
            param: "schedule.sigma_max",
            reason: format!("{} must exceed sigma_min {}", s.sigma_max, s.sigma_min),
        });
    }
    if !(s.rho.is_finite() && s.rho > 0.0) {
        errors.push(ValidationError::InvalidFormat {
            param: "schedule.rho",
            reason: format!("{} must be positive", s.rho),
        });
    }
    if !(s.beta.is_finite() && s.beta > 0.0) {
        errors.push(ValidationError::InvalidFormat {
            param: "schedule.beta",
            reason: format!("{} must be positive", s.beta),
        });
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GenerationConfig::default()), Ok(()));
    }

    #[test]
    fn unknown_names_are_reported() {
        let mut c = GenerationConfig::default();
        c.sampler = "plms".into();
        assert_eq!(
            validate_config(&c),
            Err(ValidationError::UnknownSampler("plms".into()))
        );

        let mut c = GenerationConfig::default();
        c.schedule.kind = Some("cosine".into());
        assert_eq!(
            validate_config(&c),
            Err(ValidationError::UnknownSchedule("cosine".into()))
        );
    }

    #[test]
    fn collects_multiple_errors() {
        let mut c = GenerationConfig::default();
        c.steps = 0;
        c.sampler_options.lms_order = 9;
        c.sampler_options.eta = -0.5;
        match validate_config(&c) {
            Err(ValidationError::Multiple(errs)) => assert_eq!(errs.len(), 3),
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[test]
    fn inverted_sigma_range_is_rejected() {
        let mut c = GenerationConfig::default();
        c.schedule.sigma_min = 20.0;
        let err = validate_config(&c).unwrap_err();
        assert!(err.to_string().contains("schedule.sigma_max"), "{err}");
    }

    #[test]
    fn out_of_range_display() {
        let err = ValidationError::OutOfRange {
            param: "steps",
            value: 0.0,
            min: 1.0,
            max: 1000.0,
        };
        assert_eq!(err.to_string(), "'steps' value 0 out of range [1, 1000]");
    }

    #[test]
    fn non_multiple_of_eight_is_rejected() {
        let mut c = GenerationConfig::default();
        c.height = 513;
        assert!(matches!(
            validate_config(&c),
            Err(ValidationError::InvalidFormat { param: "height", .. })
        ));
    }
}
