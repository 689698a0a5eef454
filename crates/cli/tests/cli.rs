//! Smoke tests for the printhost binary.

use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

fn printhost() -> Command {
    Command::cargo_bin("printhost").unwrap()
}

#[test]
fn parse_prints_one_code_per_line() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("job.gcode");
    fs::write(&file, "G28 X Y\nG53 G1 X100\n; done\n").unwrap();

    let assert = printhost().arg("parse").arg(&file).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["G28 X Y", "G1 X100", "; done"]);
}

#[test]
fn parse_json_emits_typed_codes() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("job.gcode");
    fs::write(&file, "M106 S0.5\n").unwrap();

    let assert = printhost()
        .arg("parse")
        .arg(&file)
        .arg("--json")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let codes: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(codes[0]["kind"], "mcode");
    assert_eq!(codes[0]["major_number"], 106);
}

#[test]
fn parse_fails_on_malformed_input() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bad.gcode");
    fs::write(&file, "G28\n!!!\n").unwrap();

    printhost().arg("parse").arg(&file).assert().failure();
}

#[test]
fn info_reports_slicer_metadata() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("job.gcode");
    fs::write(
        &file,
        "; generated by TestSlicer 1.0\nG90\nG1 Z0.2\n; layer_height = 0.2\nG1 Z8.4\n; filament used = 42mm\n",
    )
    .unwrap();

    let assert = printhost().arg("info").arg(&file).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let info: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(info["generated_by"], "TestSlicer 1.0");
    assert_eq!(info["layer_height"], 0.2);
    assert_eq!(info["height"], 8.4);
    assert_eq!(info["file_name"], "0:/job.gcode");
}

#[test]
fn resolve_maps_drive_zero_to_the_base() {
    printhost()
        .args(["resolve", "0:/gcodes/a.g", "--base", "/tmp/sd"])
        .assert()
        .success()
        .stdout("/tmp/sd/gcodes/a.g\n");
}

#[test]
fn resolve_rejects_unknown_drives() {
    printhost()
        .args(["resolve", "3:/a.g"])
        .assert()
        .failure();
}
