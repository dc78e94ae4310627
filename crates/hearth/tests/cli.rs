use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_ping_command() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("hearth")?;
    cmd.arg("--ping");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pong"));
    Ok(())
}

#[test]
fn test_no_args_runs_normally() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("hearth")?;
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Initializing application..."))
        .stdout(predicate::str::contains("Application started"))
        .stdout(predicate::str::contains("Shutting down application..."))
        .stdout(predicate::str::contains("pong").not());
    Ok(())
}

#[test]
fn test_run_drives_frames_and_workers() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("hearth")?;
    cmd.args(["run", "--frames", "2", "--workers", "3"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("worker 0 reported on main thread"))
        .stdout(predicate::str::contains("worker 2 reported on main thread"))
        .stdout(predicate::str::contains("countdown 2"))
        .stdout(predicate::str::contains("countdown 1"))
        .stdout(predicate::str::contains("heartbeat destroyed after 2 frames"));
    Ok(())
}

#[test]
fn test_missing_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut cmd = Command::cargo_bin("hearth")?;
    cmd.arg("--config").arg(dir.path().join("absent.json"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load settings"));
    Ok(())
}

#[test]
fn test_invalid_tick_rate_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("hearth.json");
    fs::write(&path, r#"{ "tick_rate_hz": 0 }"#)?;
    let mut cmd = Command::cargo_bin("hearth")?;
    cmd.arg("--config").arg(&path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("tick_rate_hz"));
    Ok(())
}

#[test]
fn test_unknown_provider_fails_bootstrap() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("hearth.toml");
    fs::write(&path, "providers = [\"events\", \"ghost\"]\n")?;
    let mut cmd = Command::cargo_bin("hearth")?;
    cmd.arg("--config").arg(&path).args(["run", "--frames", "1"]);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Shutting down application..."))
        .stderr(predicate::str::contains("ghost"));
    Ok(())
}

#[test]
fn test_providers_listing() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("hearth")?;
    cmd.arg("providers");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("- driver"))
        .stdout(predicate::str::contains("- heartbeat"));
    Ok(())
}
