//! Integration tests for the `enigma` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_workspace(dir: &Path) {
    let mut csv = String::from("hour,ip_freq,is_threat\n");
    for i in 0..120_u32 {
        let ip_freq = f64::from((i * 7) % 20) / 2.0;
        csv.push_str(&format!("{},{ip_freq:.1},{}\n", i % 24, u8::from(ip_freq > 5.0)));
    }
    fs::write(dir.join("train.csv"), csv).unwrap();
    fs::write(dir.join("score.csv"), "hour,ip_freq\n1,9.5\n2,0.5\n").unwrap();
    fs::write(
        dir.join("config.yaml"),
        r"
data:
  dataset_path: train.csv
  features: [hour, ip_freq]
  label_col: is_threat
models:
  registry_dir: registry
model:
  registry_name: threat_model
",
    )
    .unwrap();
}

fn enigma(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("enigma").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG").args(["--config", "config.yaml", "--log-level", "warn"]);
    cmd
}

fn trained_workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_workspace(temp.path());
    enigma(temp.path()).arg("train").assert().success();
    temp
}

#[test]
fn test_missing_config_fails() {
    let temp = TempDir::new().unwrap();
    Command::cargo_bin("enigma")
        .unwrap()
        .current_dir(temp.path())
        .args(["models", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_train_reports_version() {
    let temp = TempDir::new().unwrap();
    write_workspace(temp.path());

    enigma(temp.path())
        .arg("train")
        .assert()
        .success()
        .stdout(predicate::str::contains("Training complete").and(predicate::str::contains("version 1")));

    enigma(temp.path())
        .args(["train", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"version\": 2"));

    assert!(temp.path().join("registry/threat_model_v1.model").exists());
    assert!(temp.path().join("registry/threat_model_v2.json").exists());
}

#[test]
fn test_models_list_and_verify() {
    let temp = trained_workspace();

    enigma(temp.path())
        .args(["models", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("threat_model").and(predicate::str::contains("fingerprint_sha256")));

    enigma(temp.path()).args(["models", "verify"]).assert().success().stdout(predicate::str::contains("OK"));
}

#[test]
fn test_verify_detects_tampering() {
    let temp = trained_workspace();
    fs::write(temp.path().join("registry/threat_model_v1.model"), b"tampered").unwrap();

    enigma(temp.path())
        .args(["models", "verify", "threat_model", "--version", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Fingerprint mismatch"));
}

#[test]
fn test_predict_single_record() {
    let temp = trained_workspace();

    enigma(temp.path())
        .args(["predict", r#"{"ip_freq": 9.5, "hour": 3}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"predictions\"").and(predicate::str::contains("threat_model v1")));
}

#[test]
fn test_predict_missing_feature_fails() {
    let temp = trained_workspace();

    enigma(temp.path())
        .args(["predict", r#"[{"hour": 3}]"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ip_freq"));
}

#[test]
fn test_predict_without_model_fails() {
    let temp = TempDir::new().unwrap();
    write_workspace(temp.path());

    enigma(temp.path())
        .args(["predict", r#"{"ip_freq": 1.0, "hour": 3}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Artifact not found"));
}

#[test]
fn test_batch_to_file_and_stdout() {
    let temp = trained_workspace();

    enigma(temp.path()).args(["batch", "score.csv", "--output", "scored"]).assert().success();
    let written = fs::read_to_string(temp.path().join("scored.csv")).unwrap();
    assert!(written.starts_with("hour,ip_freq,prediction\n"), "{written}");

    enigma(temp.path())
        .args(["batch", "score.csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("hour,ip_freq,prediction"));
}

#[test]
fn test_batch_rejects_unknown_extension() {
    let temp = trained_workspace();
    fs::write(temp.path().join("score.txt"), "hour,ip_freq\n1,2\n").unwrap();

    enigma(temp.path())
        .args(["batch", "score.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported format"));
}
