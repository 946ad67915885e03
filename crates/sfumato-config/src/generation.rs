//! Generation settings file format and conversions.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sfumato_core::{DEFAULT_POOL_CAPACITY, TensorPool};
use sfumato_sampler::schedule::{DEFAULT_BETA, DEFAULT_RHO, DEFAULT_SIGMA_MAX, DEFAULT_SIGMA_MIN};
use sfumato_sampler::{
    Algorithm, DEFAULT_ETA, DEFAULT_GUIDANCE_SCALE, DEFAULT_LMS_ORDER, NoiseSchedule,
    SampleOptions, SamplerKind, ScheduleKind, Scheduler,
};
use sfumato_vae::{DEFAULT_TILE_SIZE_PX, LATENT_SCALE, TiledVaeDecoder};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, parse_sampler, parse_schedule, validate_config};

/// Latent channels of the supported VAE.
pub const LATENT_CHANNELS: usize = 4;

/// Settings for one image generation.
///
/// # TOML Format
///
/// ```toml
/// sampler = "dpmpp-2m-sde"
/// steps = 20
/// guidance_scale = 7.5
/// seed = 42
/// width = 512
/// height = 512
/// tile_size = 256
///
/// [schedule]
/// kind = "karras"
/// sigma_min = 0.0292
/// sigma_max = 14.6146
/// rho = 7.0
///
/// [sampler_options]
/// lms_order = 4
/// eta = 1.0
/// ```
///
/// Every field has a default, so a file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampler preset name (see [`SamplerKind`]).
    pub sampler: String,
    /// Denoising steps.
    pub steps: u32,
    /// Classifier-free guidance scale; `1.0` disables the unconditional pass.
    pub guidance_scale: f32,
    /// Seed for the initial noise and SDE noise.
    pub seed: u64,
    /// Output width in pixels (multiple of 8).
    pub width: u32,
    /// Output height in pixels (multiple of 8).
    pub height: u32,
    /// Tiled-decode tile size in pixels (multiple of 8).
    pub tile_size: u32,
    /// Buffers the tensor pool keeps per shape.
    pub pool_capacity: usize,
    /// Scan model outputs for NaN/Inf every step.
    pub nan_check: bool,
    /// Noise schedule overrides.
    pub schedule: ScheduleConfig,
    /// Algorithm-specific options.
    pub sampler_options: SamplerOptions,
}

/// Noise schedule section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Curve shape. Absent means the sampler preset's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Smallest non-zero sigma.
    pub sigma_min: f64,
    /// Largest sigma.
    pub sigma_max: f64,
    /// Karras exponent.
    pub rho: f64,
    /// Exponential-cosine shape exponent.
    pub beta: f64,
}

/// Algorithm options section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplerOptions {
    /// LMS order, 1 to 4.
    pub lms_order: usize,
    /// DPM++ SDE noise multiplier; 0 is deterministic.
    pub eta: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerKind::default().as_str().to_string(),
            steps: 20,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            seed: 0,
            width: 512,
            height: 512,
            tile_size: DEFAULT_TILE_SIZE_PX as u32,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            nan_check: false,
            schedule: ScheduleConfig::default(),
            sampler_options: SamplerOptions::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            kind: None,
            sigma_min: DEFAULT_SIGMA_MIN,
            sigma_max: DEFAULT_SIGMA_MAX,
            rho: DEFAULT_RHO,
            beta: DEFAULT_BETA,
        }
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            lms_order: DEFAULT_LMS_ORDER,
            eta: DEFAULT_ETA,
        }
    }
}

impl GenerationConfig {
    /// Sets the sampler preset.
    pub fn with_sampler(mut self, kind: SamplerKind) -> Self {
        self.sampler = kind.as_str().to_string();
        self
    }

    /// Sets the step count.
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the output size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates every field. See [`validate_config`].
    pub fn validate(&self) -> ValidationResult<()> {
        validate_config(self)
    }

    /// Parsed sampler preset.
    pub fn sampler_kind(&self) -> ValidationResult<SamplerKind> {
        parse_sampler(&self.sampler)
    }

    /// Schedule shape: the override if present, else the preset default.
    pub fn schedule_kind(&self) -> ValidationResult<ScheduleKind> {
        match &self.schedule.kind {
            Some(name) => parse_schedule(name),
            None => Ok(self.sampler_kind()?.default_schedule()),
        }
    }

    /// Noise schedule generator for these settings.
    pub fn noise_schedule(&self) -> ValidationResult<NoiseSchedule> {
        let s = &self.schedule;
        Ok(NoiseSchedule::new(self.schedule_kind()?)
            .with_sigma_range(s.sigma_min, s.sigma_max)
            .with_rho(s.rho)
            .with_beta(s.beta))
    }

    /// Integration rule with the configured options applied.
    pub fn algorithm(&self) -> ValidationResult<Algorithm> {
        Ok(match self.sampler_kind()?.algorithm() {
            Algorithm::Lms { .. } => Algorithm::Lms {
                order: self.sampler_options.lms_order,
            },
            Algorithm::DpmPp2mSde { .. } => Algorithm::DpmPp2mSde {
                eta: self.sampler_options.eta,
            },
            other => other,
        })
    }

    /// Validates, then builds a scheduler with its timesteps generated.
    pub fn build_scheduler(&self) -> Result<Scheduler, ConfigError> {
        self.validate()?;
        let mut scheduler = Scheduler::new(self.algorithm()?, self.noise_schedule()?);
        scheduler.generate_timesteps(self.steps)?;
        Ok(scheduler)
    }

    /// Per-run sampler options.
    pub fn sample_options(&self) -> SampleOptions {
        SampleOptions {
            guidance_scale: self.guidance_scale,
            seed: self.seed,
            nan_check: self.nan_check,
        }
    }

    /// Latent dims `[1, 4, height/8, width/8]`.
    pub fn latent_dims(&self) -> [usize; 4] {
        [
            1,
            LATENT_CHANNELS,
            self.height as usize / LATENT_SCALE,
            self.width as usize / LATENT_SCALE,
        ]
    }

    /// Tiled decoder for these settings.
    pub fn tiled_decoder(&self) -> TiledVaeDecoder {
        TiledVaeDecoder::new(self.tile_size as usize)
    }

    /// Empty tensor pool sized by `pool_capacity`.
    pub fn pool(&self) -> TensorPool {
        TensorPool::with_capacity(self.pool_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let c = GenerationConfig::from_toml("sampler = \"heun\"\nsteps = 30\n").unwrap();
        assert_eq!(c.sampler, "heun");
        assert_eq!(c.steps, 30);
        assert_eq!(c.width, 512);
        assert_eq!(c.schedule, ScheduleConfig::default());
    }

    #[test]
    fn nested_sections_parse() {
        let toml = r#"
            sampler = "lms"
            [schedule]
            kind = "exponential"
            beta = 2.0
            [sampler_options]
            lms_order = 2
        "#;
        let c = GenerationConfig::from_toml(toml).unwrap();
        assert_eq!(c.schedule_kind().unwrap(), ScheduleKind::Exponential);
        assert_eq!(c.noise_schedule().unwrap().beta, 2.0);
        assert_eq!(c.algorithm().unwrap(), Algorithm::Lms { order: 2 });
    }

    #[test]
    fn schedule_defaults_to_preset() {
        let c = GenerationConfig::default().with_sampler(SamplerKind::Heun);
        assert_eq!(c.schedule_kind().unwrap(), ScheduleKind::Karras);
        let c = GenerationConfig::default().with_sampler(SamplerKind::Ddpm);
        assert_eq!(c.schedule_kind().unwrap(), ScheduleKind::Discrete);
    }

    #[test]
    fn build_scheduler_prepares_steps() {
        let c = GenerationConfig::default()
            .with_sampler(SamplerKind::DpmPp2mSde)
            .with_steps(12);
        let s = c.build_scheduler().unwrap();
        assert_eq!(s.steps(), 12);
        assert_eq!(s.algorithm(), Algorithm::DpmPp2mSde { eta: 1.0 });
    }

    #[test]
    fn build_scheduler_rejects_invalid() {
        let c = GenerationConfig::default().with_steps(0);
        assert!(matches!(c.build_scheduler(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn latent_dims_follow_size() {
        let c = GenerationConfig::default().with_size(768, 512);
        assert_eq!(c.latent_dims(), [1, 4, 64, 96]);
    }

    #[test]
    fn unknown_keys_are_rejected_by_type() {
        assert!(GenerationConfig::from_toml("steps = \"many\"").is_err());
    }
}
