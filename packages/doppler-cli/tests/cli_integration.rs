use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn doppler() -> Command {
    Command::cargo_bin("doppler").unwrap()
}

fn generate(path: &Path, speed: &str, frequency: &str) {
    doppler()
        .args(["generate", "--speed", speed, "--frequency", frequency])
        .args(["--duration", "6", "--quiet", "--output"])
        .arg(path)
        .assert()
        .success();
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    doppler()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    doppler()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("doppler"));
}

#[test]
fn test_help_flag() {
    doppler()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Synthesize the sound of a tone passing"))
        .stdout(predicate::str::contains("batch"));
}

// =============================================================================
// INFO SUBCOMMAND
// =============================================================================

#[test]
fn test_info_subcommand() {
    doppler()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("doppler CLI v"))
        .stdout(predicate::str::contains("Pass geometry"));
}

#[test]
fn test_info_json() {
    let output = doppler().arg("info").arg("--json").assert().success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed.get("cli_version").is_some());
    assert_eq!(parsed["geometry"]["closest_approach"], 10.0);
    assert_eq!(parsed["analyzer"]["fallback_correction"], 0.97);
}

// =============================================================================
// GENERATE SUBCOMMAND
// =============================================================================

#[test]
fn test_generate_writes_wav() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("pass.wav");

    let output = doppler()
        .args(["generate", "--speed", "20", "--duration", "2", "--json", "--output"])
        .arg(&path)
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["samples"], 88200);
    assert_eq!(parsed["sample_rate"], 44100);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(bytes.len(), 44 + 88200 * 2);
}

#[test]
fn test_generate_rejects_supersonic_speed() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("pass.wav");

    doppler()
        .args(["generate", "--speed", "400", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("speed of sound"));
    assert!(!path.exists());
}

// =============================================================================
// ANALYZE SUBCOMMAND
// =============================================================================

#[test]
fn test_analyze_nonexistent_file() {
    doppler()
        .args(["analyze", "--file", "/nonexistent/pass.wav"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_analyze_unsupported_extension() {
    let tmp = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();

    doppler()
        .arg("analyze")
        .arg("--file")
        .arg(tmp.path())
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Unsupported"));
}

#[test]
fn test_generate_then_analyze() {
    let tmp = tempfile::tempdir().unwrap();
    let wav = tmp.path().join("pass.wav");
    let report = tmp.path().join("report.json");
    generate(&wav, "25", "150");

    doppler()
        .arg("analyze")
        .arg("--file")
        .arg(&wav)
        .args(["--duration", "6", "--frequency", "150", "--no-plots", "--quiet"])
        .arg("--output")
        .arg(&report)
        .assert()
        .success();

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    let stats = &parsed["velocity_stats"];
    assert_eq!(stats["data_quality"], "high");
    let speed = stats["avg_speed_ms"].as_f64().unwrap();
    assert!((speed - 25.0).abs() <= 25.0 * 0.15, "estimate {}", speed);
    assert_eq!(parsed["success"], true);
}

// =============================================================================
// SUMMARY SUBCOMMAND
// =============================================================================

#[test]
fn test_summary_json() {
    let tmp = tempfile::tempdir().unwrap();
    let wav = tmp.path().join("pass.wav");
    generate(&wav, "10", "150");

    let output = doppler()
        .arg("summary")
        .arg("--file")
        .arg(&wav)
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["channels"], "Mono");
    assert_eq!(parsed["doppler_detected"], true);
    assert_eq!(parsed["duration_seconds"], 6.0);
}

// =============================================================================
// BATCH SUBCOMMAND
// =============================================================================

#[test]
fn test_batch_dry_run_lists_files() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.wav"), "").unwrap();
    std::fs::write(tmp.path().join("b.wav"), "").unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "").unwrap();

    let pattern = format!("{}/*.wav", tmp.path().display());
    doppler()
        .args(["batch", "--glob", &pattern, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.wav"))
        .stdout(predicate::str::contains("b.wav"))
        .stdout(predicate::str::contains("notes.txt").not());
}

#[test]
fn test_batch_no_matches() {
    doppler()
        .args(["batch", "--glob", "/nonexistent_dir_12345/*.wav"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_batch_partial_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let good = tmp.path().join("good.wav");
    let bad = tmp.path().join("bad.wav");
    let out_dir = tmp.path().join("reports");
    generate(&good, "20", "120");
    std::fs::write(&bad, "not audio").unwrap();

    doppler()
        .arg("batch")
        .arg("--files")
        .arg(&bad)
        .arg(&good)
        .args(["--duration", "6", "--no-plots", "--continue-on-error", "--quiet"])
        .arg("--output-dir")
        .arg(&out_dir)
        .assert()
        .failure()
        .code(3);

    assert!(out_dir.join("good_report.json").exists());
    assert!(!out_dir.join("bad_report.json").exists());
}
