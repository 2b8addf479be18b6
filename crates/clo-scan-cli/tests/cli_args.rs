//! CLI argument validation tests.
//!
//! Tests command-line argument parsing, validation, and error handling.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

/// Creates a temp dir holding a minimal valid coefficient table.
fn dir_with_table() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("clo_values.toml");
    fs::write(
        &table,
        r"
base_clo = 0.1

[clo_values]
jacket = 0.3
pants = 0.2
",
    )
    .unwrap();
    (dir, table)
}

// === Missing/Invalid Path Tests ===

#[test]
fn test_missing_path_shows_error() {
    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    // No path argument at all - error goes to stderr
    cmd.assert().failure().stderr(
        predicate::str::contains("No paths specified")
            .or(predicate::str::contains("required"))
            .or(predicate::str::contains("PATHS")),
    );
}

#[test]
fn test_empty_directory_succeeds() {
    let (dir, table) = dir_with_table();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();

    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("--quiet").arg("--table").arg(&table).arg(&images);

    cmd.assert().code(0);
}

#[test]
fn test_nonexistent_input_path_warns_but_continues() {
    let (_dir, table) = dir_with_table();

    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("--quiet")
        .arg("--table")
        .arg(&table)
        .arg("/nonexistent/path/to/image.jpg");

    // No images collected = nothing to estimate
    cmd.assert().code(0);
}

// === Threshold Validation Tests ===

#[test]
fn test_invalid_conf_threshold_rejected() {
    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("--conf-threshold").arg("2.0").arg("some.jpg");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("2 is not in 0.0..=1.0"));
}

#[test]
fn test_non_numeric_iou_threshold_rejected() {
    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("--iou-threshold").arg("high").arg("some.jpg");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not a valid number"));
}

// === Table Loading Tests ===

#[test]
fn test_missing_table_aborts_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    let table = dir.path().join("no_such_table.toml");

    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("--quiet").arg("--table").arg(&table).arg(&images);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("no_such_table.toml"));
}

#[test]
fn test_malformed_table_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    let table = dir.path().join("bad.toml");
    fs::write(&table, "[clo_values\njacket = 0.3\n").unwrap();

    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("--quiet").arg("--table").arg(&table).arg(&images);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("malformed"));
}

#[test]
fn test_negative_coefficient_table_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    let table = dir.path().join("negative.toml");
    fs::write(&table, "[clo_values]\njacket = -0.3\n").unwrap();

    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("--quiet").arg("--table").arg(&table).arg(&images);

    cmd.assert().code(2).stderr(predicate::str::contains("jacket"));
}

// === Subcommand Tests ===

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("estimate").and(predicate::str::contains("models")));
}

#[test]
fn test_models_path_prints_directory() {
    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("models").arg("path");

    cmd.assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_models_list_names_detector_files() {
    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("models").arg("list");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("garment_detector"));
}

#[test]
fn test_estimate_with_missing_models_names_fetch() {
    let (dir, table) = dir_with_table();
    // A real image forces the detector to be built against an empty models dir.
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    fs::write(
        images.join("person.png"),
        // Content never reaches the decoder: the model check runs first.
        b"placeholder",
    )
    .unwrap();
    let models = dir.path().join("models");
    fs::create_dir(&models).unwrap();

    let mut cmd = Command::cargo_bin("clo-scan").unwrap();
    cmd.arg("--quiet")
        .arg("--table")
        .arg(&table)
        .arg("--models-dir")
        .arg(&models)
        .arg(&images);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("models fetch"));
}
