//! End-to-end CLI tests
//!
//! Runs the `dolgen` binary inside a temporary project directory and checks
//! exit status, messages and which files were written.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const PROJECT: &str = r#"
[project]
name = "dolsdk2001"
version_prefix = "DOLSDK"
default_revision = 36
archive_dir = "orig"
mw_version = "GC/1.2.5"

[revisions]
36 = "2001-05-22"

[tools]
compilers_tag = "20231018"
dtk_tag = "v0.7.4"
sjiswrap_tag = "v1.1.1"
wibo_tag = "0.6.9"

[flags]
base = ["-nodefaults", "-proc gekko", "-DDOLPHIN_REVISION={revision}"]

[[profile]]
name = "release"
cflags = ["-O4,p"]

[[profile]]
name = "debug"
archive_suffix = "D"
cflags = ["-opt off"]

[[library]]
name = "os"
cflags = "base"
units = [
    { name = "OSAlloc.c", complete = true },
    { name = "OSReboot.c" },
]
"#;

fn dolgen_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dolgen").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn create_project(content: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("dolgen.toml"), content).unwrap();
    let os = temp.path().join("src/os");
    fs::create_dir_all(&os).unwrap();
    fs::write(os.join("OSAlloc.c"), "void OSAlloc(void) {}\n").unwrap();
    temp
}

fn assert_nothing_written(dir: &Path) {
    assert!(!dir.join("build.ninja").exists());
    assert!(!dir.join("objdiff.json").exists());
    assert!(!dir.join("build").exists());
}

// ══════════════════════════════════════════════════════════════════════════════
// ARGUMENT ERRORS
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_unknown_mode_fails() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path())
        .arg("link")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'link'"));
    assert_nothing_written(project.path());
}

#[test]
fn test_invalid_revision_is_named() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path())
        .args(["--revision", "37"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid revision '37', expected 36"));
    assert_nothing_written(project.path());
}

#[test]
fn test_non_numeric_revision_fails() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path())
        .args(["--version", "latest"])
        .assert()
        .failure();
}

#[test]
fn test_missing_tool_names_the_tool_and_writes_nothing() {
    let project = create_project(&PROJECT.replace("compilers_tag = \"20231018\"\n", ""));
    dolgen_cmd(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No compilers available"))
        .stderr(predicate::str::contains("--compilers"));
    assert_nothing_written(project.path());
}

#[test]
fn test_missing_required_field() {
    let project = create_project(&PROJECT.replace("archive_dir = \"orig\"\n", ""));
    dolgen_cmd(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("project.archive_dir"));
    assert_nothing_written(project.path());
}

#[test]
fn test_missing_project_file() {
    let temp = TempDir::new().unwrap();
    dolgen_cmd(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("dolgen.toml"));
}

// ══════════════════════════════════════════════════════════════════════════════
// MODES
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_configure_writes_outputs() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path()).assert().success();

    let graph = fs::read_to_string(project.path().join("build.ninja")).unwrap();
    assert!(graph.contains("rule mwcc_sjis"));
    assert!(graph.contains("build build/DOLSDK-2001-05-22/release/os/src/OSAlloc.o: mwcc_sjis"));
    assert!(graph.contains("default all_source"));

    let diff: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(project.path().join("objdiff.json")).unwrap())
            .unwrap();
    assert_eq!(diff["units"].as_array().unwrap().len(), 4);
    assert!(project.path().join("build/dolgen-state.json").exists());
}

#[test]
fn test_regeneration_is_deterministic() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path()).args(["--debug"]).assert().success();
    let first = fs::read(project.path().join("build.ninja")).unwrap();

    dolgen_cmd(project.path()).args(["--debug"]).assert().success();
    assert_eq!(fs::read(project.path().join("build.ninja")).unwrap(), first);

    let graph = String::from_utf8(first).unwrap();
    assert!(graph.contains("configure_args = --debug\n"));
    assert!(graph.contains("-sym on"));
}

#[test]
fn test_map_flag_is_replayed() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path()).arg("--map").assert().success();

    let graph = fs::read_to_string(project.path().join("build.ninja")).unwrap();
    assert!(graph.contains("configure_args = --map\n"));
}

#[test]
fn test_diff_config_mode() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path()).arg("diff-config").assert().success();
    assert!(project.path().join("objdiff.json").exists());
    assert!(!project.path().join("build.ninja").exists());
}

#[test]
fn test_check_writes_nothing() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("dolsdk2001 (DOLSDK-2001-05-22)"))
        .stdout(predicate::str::contains("4 objects in 2 archives"))
        .stdout(predicate::str::contains("2 compile steps, 2 missing sources"))
        .stdout(predicate::str::contains("Build graph: not generated"));
    assert_nothing_written(project.path());
}

#[test]
fn test_check_after_configure_is_current() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path()).assert().success();
    dolgen_cmd(project.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Build graph: up to date"));

    dolgen_cmd(project.path())
        .args(["check", "--debug"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build graph: out of date"));
}

#[test]
fn test_progress_report() {
    let project = create_project(PROJECT);
    let out = project.path().join("build/DOLSDK-2001-05-22");
    fs::create_dir_all(&out).unwrap();
    fs::write(
        out.join("config.json"),
        r#"{"units": [
            {"name": "os/OSAlloc", "code_size": 120, "data_size": 0},
            {"name": "os/OSReboot", "code_size": 120, "data_size": 0}
        ]}"#,
    )
    .unwrap();

    dolgen_cmd(project.path())
        .arg("progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress:"))
        .stdout(predicate::str::contains("  DOL: 50.00% code, 0.00% data (1 / 2 files)"))
        .stdout(predicate::str::contains("    Code: 120 / 240 bytes"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("progress.json")).unwrap()).unwrap();
    assert_eq!(json["dol"]["code"], 120);
}

#[test]
fn test_progress_without_results_fails() {
    let project = create_project(PROJECT);
    dolgen_cmd(project.path())
        .arg("progress")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.json"));
}

#[test]
fn test_missing_source_warning_for_complete_unit() {
    let project = create_project(PROJECT);
    fs::remove_file(project.path().join("src/os/OSAlloc.c")).unwrap();
    dolgen_cmd(project.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Missing source file"));
}
