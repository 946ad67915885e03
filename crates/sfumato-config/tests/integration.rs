//! Settings file round trips and preset wiring.

use sfumato_config::{
    ConfigError, GenerationConfig, SamplerOptions, ValidationError, get_factory_preset,
};
use sfumato_sampler::{Algorithm, SamplerKind, ScheduleKind};

#[test]
fn save_and_load_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("gen.toml");

    let mut config = GenerationConfig::default()
        .with_sampler(SamplerKind::Lms)
        .with_steps(30)
        .with_size(768, 512)
        .with_seed(1234);
    config.schedule.kind = Some("karras".to_string());
    config.sampler_options = SamplerOptions {
        lms_order: 3,
        eta: 0.0,
    };
    config.save(&path).unwrap();

    let loaded = GenerationConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.schedule_kind().unwrap(), ScheduleKind::Karras);
    assert_eq!(loaded.algorithm().unwrap(), Algorithm::Lms { order: 3 });
}

#[test]
fn missing_file_reports_path() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("absent.toml");
    let err = GenerationConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = GenerationConfig::from_toml("steps = [").unwrap_err();
    assert!(matches!(err, ConfigError::TomlParse(_)));
}

#[test]
fn unknown_sampler_blocks_scheduler() {
    let config = GenerationConfig::from_toml("sampler = \"plms\"").unwrap();
    let err = config.build_scheduler().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Validation(ValidationError::UnknownSampler(ref s)) if s == "plms"
    ));
}

#[test]
fn preset_drives_a_full_setup() {
    let config = get_factory_preset("ancestral").unwrap().with_size(512, 256);
    let scheduler = config.build_scheduler().unwrap();
    assert_eq!(scheduler.steps(), 25);
    assert!(scheduler.schedule().is_some());

    let options = config.sample_options();
    assert_eq!(options.guidance_scale, 7.0);

    let grid = config.tiled_decoder().plan(64, 32).unwrap();
    assert_eq!((grid.tiles_x(), grid.tiles_y()), (2, 1));
    assert_eq!(config.latent_dims(), [1, 4, 32, 64]);
}

#[test]
fn written_file_is_readable_toml() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("gen.toml");
    GenerationConfig::default().save(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("sampler = \"euler\""));
    assert!(text.contains("[schedule]"));
    assert!(!text.contains("kind"));
}
