//! End-to-end tests for the fragrun CLI
//!
//! These tests verify:
//! - Changelog output in text and JSON form
//! - Dry runs list commands without touching the work directory
//! - Exit codes for configuration errors and failing processes
//!
//! No test needs network access.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn fragrun() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fragrun"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// A tool root holding an MSFragger jar
fn tools_dir() -> TempDir {
    let tools = TempDir::new().unwrap();
    fs::write(tools.path().join("MSFragger.jar"), b"").unwrap();
    tools
}

fn run_args(tools: &Path, work: &Path) -> Vec<String> {
    vec![
        "run".to_string(),
        "--no-update-check".to_string(),
        "-w".to_string(),
        work.display().to_string(),
        "--tools".to_string(),
        tools.display().to_string(),
        "--database".to_string(),
        "/db/proteins.fasta".to_string(),
        "--lcms".to_string(),
        "/data/sample1.mzML".to_string(),
        "--threads".to_string(),
        "2".to_string(),
    ]
}

mod changelog {
    use super::*;

    #[test]
    fn test_prints_changelog() {
        fragrun()
            .arg("changelog")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("### Changelog:\n"))
            .stdout(predicate::str::contains("\nv17.0:\n - "));
    }

    #[test]
    fn test_limit() {
        let output = fragrun()
            .args(["changelog", "--limit", "1"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        let versions = stdout.lines().filter(|l| l.starts_with('v')).count();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_release_notes() {
        fragrun()
            .args(["changelog", "--release-notes", "--limit", "1"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("FragPipe v17.1\n"))
            .stdout(predicate::str::contains("/download/17.1/FragPipe-jre-17.1.zip"))
            .stdout(predicate::str::contains("### Changelog:"));
    }

    #[test]
    fn test_json() {
        let output = fragrun()
            .args(["changelog", "--json", "--limit", "2"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["entries"].as_array().unwrap().len(), 2);
        assert!(value.get("release").is_none());
    }
}

mod check_updates {
    use super::*;

    #[test]
    fn test_offline_json() {
        let output = fragrun()
            .args(["check-updates", "--offline", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let advisory = &value["components"][0]["advisory"];
        assert_eq!(advisory["subject"], "FragPipe");
        assert_eq!(advisory["local_version"], "17.1");
        assert!(advisory["remote_version"].is_null());
    }

    #[test]
    fn test_offline_text_with_jar() {
        let tools = TempDir::new().unwrap();
        fs::write(tools.path().join("MSFragger-3.4.jar"), b"").unwrap();
        fragrun()
            .args(["check-updates", "--offline", "--msfragger-jar", "MSFragger-3.4.jar", "--tools"])
            .arg(tools.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("FragPipe 17.1 is up to date"))
            .stdout(predicate::str::contains("MSFragger 3.4 is up to date"));
    }
}

mod run {
    use super::*;

    #[test]
    fn test_dry_run_missing_work_dir() {
        let tools = tools_dir();
        let work = tools.path().join("work");

        fragrun()
            .args(run_args(tools.path(), &work))
            .assert()
            .success()
            .stdout(predicate::str::contains("[MSFragger]"))
            .stdout(predicate::str::contains("-jar"))
            .stdout(predicate::str::contains("/data/sample1.mzML"));
        assert!(!work.exists());
    }

    #[test]
    fn test_dry_run_json() {
        let tools = tools_dir();
        let work = tools.path().join("work");

        let output = fragrun()
            .args(run_args(tools.path(), &work))
            .args(["--json", "--ram", "16"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["dry_run"], true);
        let command = value["stages"][0]["commands"][0].as_str().unwrap();
        assert!(command.starts_with("java -Xmx16G -jar "));
    }

    #[test]
    fn test_missing_tool_fails() {
        let tools = TempDir::new().unwrap();
        let work = tools.path().join("work");

        fragrun()
            .args(run_args(tools.path(), &work))
            .assert()
            .code(1)
            .stderr(predicate::str::contains("missing dependencies: MSFragger.jar"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let tools = tools_dir();
        let work = tools.path().join("work");

        let mut args = run_args(tools.path(), &work);
        if let Some(threads) = args.last_mut() {
            *threads = "0".to_string();
        }

        fragrun()
            .args(args)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("threads"));
    }

    #[test]
    fn test_requires_lcms() {
        fragrun()
            .args(["run", "-w", "/tmp/x", "--database", "/db.fasta"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--lcms"));
    }

    #[cfg(unix)]
    fn fake_java(dir: &Path, exit_code: i32) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("java");
        fs::write(&path, format!("#!/bin/sh\necho searching \"$@\"\nexit {}\n", exit_code)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_pipeline() {
        let tools = tools_dir();
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let java = fake_java(bin.path(), 0);

        fragrun()
            .args(run_args(tools.path(), work.path()))
            .arg("--java")
            .arg(&java)
            .assert()
            .success()
            .stdout(predicate::str::contains("MSFragger: 1 process(es)"));

        let params = fs::read_to_string(work.path().join("fragger.params")).unwrap();
        assert!(params.contains("num_threads = 2"));
        assert!(params.contains("database_name = /db/proteins.fasta"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_process_exit_code() {
        let tools = tools_dir();
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let java = fake_java(bin.path(), 3);

        fragrun()
            .args(run_args(tools.path(), work.path()))
            .arg("--java")
            .arg(&java)
            .arg("--quiet")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("exit code 3"));
    }
}
