//! End-to-end runs of the toolkit-runner binary
//!
//! The cli engine is pointed at a shell script standing in for `docker`:
//! it finds the `-v host:/github/workspace` mount and acts on the host
//! directory the way the toolkit container would.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn runner() -> Command {
    let mut cmd = Command::cargo_bin("toolkit-runner").unwrap();
    cmd.env_remove("ACTION_CXX_TOOLKIT_IMAGE")
        .env_remove("ACTION_CXX_TOOLKIT_REPO")
        .env("RUST_LOG", "warn");
    cmd
}

/// Write a fake docker executable whose behaviour is `body`; `$ws` is the
/// mounted host workspace
#[cfg(unix)]
fn fake_docker(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        r#"#!/bin/sh
all="$*"
ws=""
while [ $# -gt 0 ]; do
  case "$1" in
    -v) ws="${{2%%:*}}"; shift 2 ;;
    *) shift ;;
  esac
done
echo "$all" > "$ws/../docker-args.txt"
{}
"#,
        body
    );

    let path = dir.join("fake-docker");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn workspace(root: &Path) -> PathBuf {
    let ws = root.join("test/simple_make");
    fs::create_dir_all(&ws).unwrap();
    ws
}

/// Scenario A: the action writes test_app → OK, exit 0, test_app removed
#[cfg(unix)]
#[test]
fn test_artifact_produced() {
    let root = tempfile::tempdir().unwrap();
    let ws = workspace(root.path());
    let docker = fake_docker(root.path(), r#"touch "$ws/test_app"; exit 0"#);

    runner()
        .args(["--engine", "cli", "--docker-bin"])
        .arg(&docker)
        .args(["exec", "--workdir"])
        .arg(&ws)
        .args(["-i", "checks=make", "--expect-file", "test_app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\nOK\n"))
        .stdout(predicate::str::contains("TEST FAILED").not());

    assert!(!ws.join("test_app").exists());
}

/// Scenario B: no test_app → TEST FAILED, exit 1
#[cfg(unix)]
#[test]
fn test_artifact_missing() {
    let root = tempfile::tempdir().unwrap();
    let ws = workspace(root.path());
    let docker = fake_docker(root.path(), "exit 0");

    runner()
        .args(["--engine", "cli", "--docker-bin"])
        .arg(&docker)
        .args(["exec", "--workdir"])
        .arg(&ws)
        .args(["--expect-file", "test_app"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\nTEST FAILED\n"));

    assert!(!ws.join("test_app").exists());
}

/// Scenario C: exit status 3 under the exit-code criterion → TEST FAILED
#[cfg(unix)]
#[test]
fn test_nonzero_exit() {
    let root = tempfile::tempdir().unwrap();
    let ws = workspace(root.path());
    let docker = fake_docker(root.path(), r#"touch "$ws/test_app"; exit 3"#);

    runner()
        .args(["--engine", "cli", "--docker-bin"])
        .arg(&docker)
        .args(["exec", "--workdir"])
        .arg(&ws)
        .args(["-i", "checks=clang-tidy"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("TEST FAILED"));
}

#[cfg(unix)]
#[test]
fn test_catalog_case_with_relative_workspace() {
    let root = tempfile::tempdir().unwrap();
    let ws = workspace(root.path());
    let docker = fake_docker(root.path(), r#"touch "$ws/test_app"; mkdir -p "$ws/build""#);
    fs::write(ws.join("test_app"), b"stale").unwrap();

    fs::write(
        root.path().join("cases.json"),
        r#"{"test_cases": [{
            "name": "simple_make",
            "working_directory": "./test/simple_make",
            "inputs": {"checks": "make", "cc": "gcc"},
            "success": {"kind": "file_exists", "path": "test_app"},
            "cleanup": ["build"]
        }]}"#,
    )
    .unwrap();

    runner()
        .current_dir(root.path())
        .args(["--catalog", "cases.json", "--engine", "cli", "--docker-bin"])
        .arg(&docker)
        .args(["--image", "local/toolkit:dev", "run", "simple_make"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));

    assert!(!ws.join("test_app").exists());
    assert!(!ws.join("build").exists());

    let args = fs::read_to_string(root.path().join("test/docker-args.txt")).unwrap();
    assert!(args.starts_with("run --rm -v "));
    assert!(args.contains(&format!("{}:/github/workspace", ws.display())));
    assert!(args.contains("-e INPUT_CHECKS=make"));
    assert!(args.contains("-e INPUT_CC=gcc"));
    assert!(args.trim_end().ends_with("local/toolkit:dev"));
}

#[cfg(unix)]
#[test]
fn test_image_from_environment() {
    let root = tempfile::tempdir().unwrap();
    let ws = workspace(root.path());
    let docker = fake_docker(root.path(), "exit 0");

    runner()
        .env("ACTION_CXX_TOOLKIT_REPO", "mirror/toolkit")
        .args(["--engine", "cli", "--variant", "gcc12-ubuntu22.04", "--docker-bin"])
        .arg(&docker)
        .args(["exec", "--workdir"])
        .arg(&ws)
        .assert()
        .success();

    let args = fs::read_to_string(root.path().join("test/docker-args.txt")).unwrap();
    assert!(args.trim_end().ends_with("mirror/toolkit:gcc12-ubuntu22.04"));
}

#[cfg(unix)]
#[test]
fn test_run_all_reports_each_case() {
    let root = tempfile::tempdir().unwrap();
    workspace(root.path());
    let docker = fake_docker(root.path(), r#"touch "$ws/test_app"; exit 0"#);

    fs::write(
        root.path().join("cases.json"),
        r#"{"test_cases": [
            {"name": "builds", "working_directory": "test/simple_make",
             "success": {"kind": "file_exists", "path": "test_app"}},
            {"name": "wrong_artifact", "working_directory": "test/simple_make",
             "success": {"kind": "file_exists", "path": "other_app"}}
        ]}"#,
    )
    .unwrap();

    runner()
        .current_dir(root.path())
        .args(["--catalog", "cases.json", "--engine", "cli", "--docker-bin"])
        .arg(&docker)
        .arg("run-all")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\nOK\n"))
        .stdout(predicate::str::contains("\nTEST FAILED\n"));
}

#[test]
fn test_missing_docker_binary_fails_the_case() {
    let root = tempfile::tempdir().unwrap();
    let ws = workspace(root.path());

    runner()
        .args(["--engine", "cli", "--docker-bin", "/nonexistent/docker", "exec", "--workdir"])
        .arg(&ws)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("TEST FAILED"));
}

#[cfg(unix)]
#[test]
fn test_cleanup_of_workspace_is_refused() {
    let root = tempfile::tempdir().unwrap();
    let ws = workspace(root.path());
    fs::write(ws.join("main.cpp"), b"int main() {}").unwrap();
    let docker = fake_docker(root.path(), "exit 0");

    for cleanup in ["./", ".."] {
        runner()
            .args(["--engine", "cli", "--docker-bin"])
            .arg(&docker)
            .args(["exec", "--workdir"])
            .arg(&ws)
            .args(["--cleanup", cleanup])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("would remove the workspace"))
            .stdout(predicate::str::contains("TEST FAILED").not());

        assert!(ws.join("main.cpp").exists());
        assert!(!root.path().join("test/docker-args.txt").exists());
    }
}

#[test]
fn test_json_log_format() {
    let root = tempfile::tempdir().unwrap();
    let ws = workspace(root.path());

    runner()
        .env("LOG_FORMAT", "json")
        .args(["--engine", "cli", "--docker-bin", "/nonexistent/docker", "exec", "--workdir"])
        .arg(&ws)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(r#""level":"ERROR""#))
        .stdout(predicate::str::contains("TEST FAILED"));
}

#[test]
fn test_unknown_case_is_a_config_error() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("cases.json"), r#"{"test_cases": []}"#).unwrap();

    runner()
        .current_dir(root.path())
        .args(["--catalog", "cases.json", "run", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No test case named 'nope'"))
        .stdout(predicate::str::contains("TEST FAILED").not());
}

#[test]
fn test_list_shipped_catalog() {
    let catalog = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/test-cases.json");

    runner()
        .arg("--catalog")
        .arg(&catalog)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("simple_make"))
        .stdout(predicate::str::contains("clang_tidy"));
}

#[test]
fn test_images_marks_selected_variant() {
    runner()
        .args(["--variant", "clang15-ubuntu22.04", "images"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Selected image: lucteo/action-cxx-toolkit:clang15-ubuntu22.04",
        ))
        .stdout(predicate::str::contains("* clang15-ubuntu22.04"))
        .stdout(predicate::str::contains("gcc7-cuda_multi-nvhpc22.7-ubuntu20.04"));
}
