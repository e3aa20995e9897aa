//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

/// A `yumi` command isolated from the developer's .env and ~/.yumi
fn yumi(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("yumi").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("DATABASE_URL")
        .env_remove("YUMI_BIND")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("calc"));
}

#[test]
fn test_version() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("yumi"));
}

#[test]
fn test_serve_help() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Address to bind to"))
        .stdout(predicate::str::contains("--cors-permissive"));
}

// === calc ===

#[test]
fn test_calc_ideal_weight() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .args(["calc", "ideal-weight", "--altura", "170", "--sexo", "masculino"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Peso ideal:      65.9 kg"));
}

#[test]
fn test_calc_ideal_weight_rejects_bad_height() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .args(["calc", "ideal-weight", "--altura", "0", "--sexo", "f"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("altura"));
}

#[test]
fn test_calc_daily_json() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .args([
            "calc", "daily", "--json", "--peso", "70", "--altura", "175", "--edad", "30", "--sexo",
            "masculino", "--actividad", "muy activo", "--objetivo", "perder",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"distribucion\""))
        .stdout(predicate::str::contains("\"imc\""));
}

#[test]
fn test_calc_daily_rejects_unknown_activity() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .args([
            "calc", "daily", "--peso", "70", "--altura", "175", "--edad", "30", "--sexo", "f",
            "--actividad", "extremo",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("actividad"));
}

#[test]
fn test_calc_recipe() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .args(["calc", "recipe", "-i", "arroz:200:g", "-i", "huevo:2:u", "--porciones", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total:"))
        .stdout(predicate::str::contains("(2 porciones)"));
}

// === database commands ===

#[test]
fn test_migrate_requires_database_url() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL not set"));
}

#[test]
fn test_config_path_under_home() {
    let home = tempfile::tempdir().unwrap();
    yumi(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".yumi"))
        .stdout(predicate::str::contains("config.toml"));
}
