//! Factory generation presets bundled with the library.
//!
//! Each preset is a partial settings file; keys it leaves out keep their
//! [`GenerationConfig`] defaults.

use crate::error::ConfigError;
use crate::generation::GenerationConfig;

/// Names of the factory presets.
pub static FACTORY_PRESET_NAMES: &[&str] = &["draft", "balanced", "quality", "ancestral"];

static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("draft", DRAFT_PRESET),
    ("balanced", BALANCED_PRESET),
    ("quality", QUALITY_PRESET),
    ("ancestral", ANCESTRAL_PRESET),
];

/// Few steps for quick previews.
const DRAFT_PRESET: &str = r#"
sampler = "euler"
steps = 8
guidance_scale = 5.0
"#;

const BALANCED_PRESET: &str = r#"
sampler = "euler-karras"
steps = 20
guidance_scale = 7.5
"#;

/// Second-order corrector with more steps.
const QUALITY_PRESET: &str = r#"
sampler = "heun"
steps = 40
guidance_scale = 7.5

[schedule]
kind = "karras"
rho = 7.0
"#;

/// Stochastic multistep sampling.
const ANCESTRAL_PRESET: &str = r#"
sampler = "dpmpp-2m-sde"
steps = 25
guidance_scale = 7.0

[sampler_options]
eta = 1.0
"#;

/// Returns every factory preset, parsed.
pub fn factory_presets() -> Vec<(&'static str, GenerationConfig)> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(name, toml)| {
            GenerationConfig::from_toml(toml)
                .ok()
                .map(|config| (*name, config))
        })
        .collect()
}

/// Looks up a factory preset by name (case-insensitive).
pub fn get_factory_preset(name: &str) -> Result<GenerationConfig, ConfigError> {
    let (_, toml) = FACTORY_PRESETS_TOML
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))?;
    GenerationConfig::from_toml(toml)
}

/// True if `name` names a factory preset.
pub fn is_factory_preset(name: &str) -> bool {
    FACTORY_PRESET_NAMES
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name))
}
