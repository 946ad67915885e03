//! Integration tests for the `sfumato` binary.

use std::process::Command;

fn sfumato_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sfumato"))
}

// ---------------------------------------------------------------------------
// `sfumato schedule`
// ---------------------------------------------------------------------------

#[test]
fn schedule_json_ends_in_zero() {
    let output = sfumato_bin()
        .args(["schedule", "--sampler", "euler-karras", "--steps", "10", "--json"])
        .output()
        .expect("failed to run sfumato schedule");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["algorithm"], "euler");
    assert_eq!(report["schedule"], "karras");
    let sigmas = report["sigmas"].as_array().unwrap();
    assert_eq!(sigmas.len(), 11);
    assert_eq!(sigmas[10].as_f64(), Some(0.0));
    assert_eq!(report["timesteps"].as_array().unwrap().len(), 10);
}

#[test]
fn schedule_table_lists_steps() {
    let output = sfumato_bin()
        .args(["schedule", "--sampler", "ddpm", "--steps", "4"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ddpm"));
    assert!(stdout.contains("discrete"));
    assert!(stdout.contains("999"));
}

#[test]
fn schedule_rejects_unknown_sampler() {
    let output = sfumato_bin()
        .args(["schedule", "--sampler", "plms"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown sampler"));
}

// ---------------------------------------------------------------------------
// `sfumato tiles`
// ---------------------------------------------------------------------------

#[test]
fn tiles_default_is_two_by_two() {
    let output = sfumato_bin().arg("tiles").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2x2 tiles (4 total)"), "got: {stdout}");
}

#[test]
fn tiles_json_reports_grid() {
    let output = sfumato_bin()
        .args(["tiles", "--width", "768", "--height", "512", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["tiles_x"], 3);
    assert_eq!(report["tiles_y"], 2);
    assert_eq!(report["overlap"], 8);
    assert_eq!(report["tiles"].as_array().unwrap().len(), 6);
}

#[test]
fn tiles_rejects_unaligned_size() {
    let output = sfumato_bin()
        .args(["tiles", "--width", "500"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// `sfumato simulate`
// ---------------------------------------------------------------------------

#[test]
fn simulate_writes_ppm() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out.ppm");
    let output = sfumato_bin()
        .args([
            "simulate", "--steps", "6", "--width", "64", "--height", "64", "--tile-size", "32",
            "--quiet", "--output",
        ])
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("decoded 4/4 tiles"), "got: {stdout}");

    let bytes = std::fs::read(&out).unwrap();
    let header = b"P6\n64 64\n255\n";
    assert!(bytes.starts_with(header));
    assert_eq!(bytes.len(), header.len() + 64 * 64 * 3);
}

#[test]
fn simulate_every_sampler() {
    for sampler in ["euler", "heun", "lms", "dpmpp-2m-sde", "ddpm"] {
        let output = sfumato_bin()
            .args([
                "simulate", "--sampler", sampler, "--steps", "5", "--width", "32", "--height",
                "32", "--quiet", "--single-shot",
            ])
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "{sampler}: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

// ---------------------------------------------------------------------------
// `sfumato config`
// ---------------------------------------------------------------------------

#[test]
fn config_init_show_validate() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("gen.toml");

    let init = sfumato_bin()
        .args(["config", "init", "--preset", "quality"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(init.status.success());
    assert!(path.exists());

    let again = sfumato_bin()
        .args(["config", "init"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!again.status.success(), "init must not overwrite without --force");

    let show = sfumato_bin().args(["config", "show"]).arg(&path).output().unwrap();
    assert!(show.status.success());
    assert!(String::from_utf8_lossy(&show.stdout).contains("sampler = \"heun\""));

    let validate = sfumato_bin()
        .args(["config", "validate"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(validate.status.success());
}

#[test]
fn config_validate_lists_problems() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bad.toml");
    std::fs::write(&path, "steps = 0\nwidth = 500\n[sampler_options]\nlms_order = 7\n").unwrap();

    let output = sfumato_bin()
        .args(["config", "validate"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 problems"), "got: {stdout}");
    assert!(stdout.contains("steps"));
    assert!(stdout.contains("width"));
    assert!(stdout.contains("lms_order"));
}

#[test]
fn config_presets_lists_factory() {
    let output = sfumato_bin().args(["config", "presets"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["draft", "balanced", "quality", "ancestral"] {
        assert!(stdout.contains(name), "missing {name}");
    }
}
