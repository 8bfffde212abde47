//! End-to-end tests for the build graph helper

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn tool_cmd() -> Command {
    let mut cmd = Command::cargo_bin("dolgen-tool").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_transform_dep_in_place() {
    let temp = TempDir::new().unwrap();
    let dep = temp.path().join("OSAlloc.d");
    fs::write(
        &dep,
        "build\\os\\OSAlloc.o: \\\r\n\tZ:\\work\\src\\os\\OSAlloc.c \\\r\n\tZ:\\work\\include\\os.h\r\n",
    )
    .unwrap();

    tool_cmd()
        .env("WINEPREFIX", temp.path().join("prefix"))
        .arg("transform-dep")
        .arg(&dep)
        .arg(&dep)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&dep).unwrap(),
        "build/os/OSAlloc.o: \\\n\t/work/src/os/OSAlloc.c \\\n\t/work/include/os.h\n"
    );
}

#[test]
fn test_transform_dep_resolves_wine_drive() {
    let temp = TempDir::new().unwrap();
    let sdk = temp.path().join("prefix/dosdevices/c:/sdk");
    fs::create_dir_all(&sdk).unwrap();
    fs::write(sdk.join("os.h"), "").unwrap();
    let input = temp.path().join("in.d");
    let output = temp.path().join("out/out.d");
    fs::write(&input, "a.o: \\\n\tC:\\sdk\\os.h\n").unwrap();

    tool_cmd()
        .env("WINEPREFIX", temp.path().join("prefix"))
        .arg("transform-dep")
        .arg(&input)
        .arg(&output)
        .assert()
        .success();

    let expected = fs::canonicalize(sdk.join("os.h")).unwrap();
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        format!("a.o: \\\n\t{}\n", expected.display())
    );
}

#[test]
fn test_transform_dep_missing_input() {
    let temp = TempDir::new().unwrap();
    tool_cmd()
        .arg("transform-dep")
        .arg(temp.path().join("missing.d"))
        .arg(temp.path().join("out.d"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.d"));
    assert!(!temp.path().join("out.d").exists());
}

#[test]
fn test_download_unknown_tool() {
    let temp = TempDir::new().unwrap();
    tool_cmd()
        .args(["download", "mwcc"])
        .arg(temp.path().join("mwcc"))
        .args(["--tag", "1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tool 'mwcc'"));
}
