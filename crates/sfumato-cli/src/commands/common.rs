//! Shared CLI helpers used across multiple commands.

use std::path::PathBuf;

use clap::Args;
use sfumato_config::{GenerationConfig, get_factory_preset, parse_sampler, parse_schedule};

/// Where settings come from, plus per-field overrides.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Settings file (TOML)
    #[arg(short, long, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Factory preset name (draft, balanced, quality, ancestral)
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Sampler (euler, euler-karras, euler-linear, euler-exponential, heun, lms, dpmpp-2m-sde, ddpm)
    #[arg(short, long)]
    pub sampler: Option<String>,

    /// Number of denoising steps
    #[arg(long)]
    pub steps: Option<u32>,

    /// Noise schedule override (karras, linear, exponential, discrete)
    #[arg(long)]
    pub schedule: Option<String>,

    /// Guidance scale
    #[arg(short, long)]
    pub guidance: Option<f32>,

    /// Seed for initial and SDE noise
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Tile size in pixels
    #[arg(long)]
    pub tile_size: Option<u32>,
}

impl SettingsArgs {
    /// Loads the base settings and applies overrides.
    ///
    /// Names are checked here so typos fail before any work starts.
    pub fn resolve(&self) -> anyhow::Result<GenerationConfig> {
        let mut config = match (&self.config, &self.preset) {
            (Some(path), _) => GenerationConfig::load(path)?,
            (None, Some(name)) => get_factory_preset(name)?,
            (None, None) => GenerationConfig::default(),
        };

        if let Some(sampler) = &self.sampler {
            config.sampler = parse_sampler(sampler)?.as_str().to_string();
        }
        if let Some(schedule) = &self.schedule {
            config.schedule.kind = Some(parse_schedule(schedule)?.as_str().to_string());
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(guidance) = self.guidance {
            config.guidance_scale = guidance;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(tile_size) = self.tile_size {
            config.tile_size = tile_size;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_preset() {
        let args = SettingsArgs {
            preset: Some("draft".into()),
            steps: Some(4),
            sampler: Some("EULER_KARRAS".into()),
            ..SettingsArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.steps, 4);
        assert_eq!(config.sampler, "euler-karras");
        assert_eq!(config.guidance_scale, 5.0);
    }

    #[test]
    fn unknown_names_fail_early() {
        let args = SettingsArgs {
            schedule: Some("cosine".into()),
            ..SettingsArgs::default()
        };
        assert!(args.resolve().is_err());
    }
}
