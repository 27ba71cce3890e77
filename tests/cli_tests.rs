//! CLI surface tests that need no real media

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn vidtrim(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vidtrim").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("VIDTRIM_LOG_LEVEL")
        .env_remove("VIDTRIM_OUTPUT_FORMAT")
        .env_remove("VIDTRIM_RECORD_DELAY_MS")
        .env_remove("VIDTRIM_PLAYBACK_RATE")
        .env_remove("VIDTRIM_OUTPUT_DIR");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    vidtrim(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("trim").and(predicate::str::contains("inspect")));
}

#[test]
fn test_trim_requires_input() {
    let dir = TempDir::new().unwrap();
    vidtrim(&dir)
        .args(["trim", "--start", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--input"));
}

#[test]
fn test_missing_input_reports_load_failure() {
    let dir = TempDir::new().unwrap();
    vidtrim(&dir)
        .args(["trim", "--input", "missing.mp4", "--start", "2", "--end", "8"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Could not load the selected video: NotFoundError",
        ));
}

#[test]
fn test_invalid_time_rejected() {
    let dir = TempDir::new().unwrap();
    vidtrim(&dir)
        .args(["trim", "--input", "clip.mp4", "--start", "two"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid start time 'two'"));
}

#[test]
fn test_unsupported_format_rejected() {
    let dir = TempDir::new().unwrap();
    vidtrim(&dir)
        .args(["trim", "--input", "clip.mp4", "--format", "avi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("avi"));
}

#[test]
fn test_non_positive_rate_rejected() {
    let dir = TempDir::new().unwrap();
    vidtrim(&dir)
        .args(["trim", "--input", "clip.mp4", "--rate", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Playback rate must be positive"));
}

#[test]
fn test_bad_config_file_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("vidtrim.toml"), "[output]\ncodec = \"vp9\"\n").unwrap();
    vidtrim(&dir)
        .args(["inspect", "--input", "clip.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_inspect_missing_file() {
    let dir = TempDir::new().unwrap();
    vidtrim(&dir)
        .args(["inspect", "--input", "missing.mp4", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to inspect missing.mp4"));
}
