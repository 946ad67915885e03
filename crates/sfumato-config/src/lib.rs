//! Generation settings, factory presets, and validation for sfumato.
//!
//! # Features
//!
//! - **Settings files**: load and save [`GenerationConfig`] as TOML
//! - **Validation**: every field checked, all problems reported together
//! - **Factory presets**: built-in settings for common speed/quality trade-offs
//! - **Paths**: platform-specific config directory (`std` feature)
//!
//! # Example
//!
//! ```rust,no_run
//! use sfumato_config::{GenerationConfig, get_factory_preset};
//!
//! let config = get_factory_preset("quality").unwrap().with_seed(42);
//! config.save("quality.toml").unwrap();
//!
//! let loaded = GenerationConfig::load("quality.toml").unwrap();
//! let scheduler = loaded.build_scheduler().unwrap();
//! assert_eq!(scheduler.steps(), 40);
//! ```

mod error;
mod generation;

/// Platform-specific paths for settings files.
pub mod paths;

/// Settings validation.
pub mod validation;

/// Factory presets bundled with the library.
pub mod presets;

pub use error::ConfigError;
pub use generation::{GenerationConfig, LATENT_CHANNELS, SamplerOptions, ScheduleConfig};
pub use paths::CONFIG_FILE_NAME;
#[cfg(feature = "std")]
pub use paths::{default_config_path, ensure_user_config_dir, user_config_dir};
pub use presets::{FACTORY_PRESET_NAMES, factory_presets, get_factory_preset, is_factory_preset};
pub use validation::{
    MAX_ETA, MAX_GUIDANCE_SCALE, MAX_IMAGE_SIDE, ValidationError, ValidationResult,
    parse_sampler, parse_schedule, validate_config,
};
