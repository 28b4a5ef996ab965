#![cfg(unix)]

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::thread;
use std::time::{Duration, Instant};

use meros_test::{write_paired_fastq, write_single_fastq, TestEnvironment};

/// Stand-in for `bwa mem`: one unmapped SAM line per mate-1 record
const STUB_BWA: &str = r#"#!/bin/sh
case "$1" in
  mem)
    shift 3
    printf '@PG\tID:bwa\n'
    awk 'NR % 4 == 1 { sub(/^@/, ""); print $1 "\t4\t*\t0\t0\t*\t*\t0\t0\t*\t*" }' "$2"
    ;;
  fail)
    echo "stub failure" >&2
    exit 7
    ;;
  *)
    echo "unsupported: $1" >&2
    exit 1
    ;;
esac
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, body)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn meros_cmd(env: &TestEnvironment) -> Command {
    let mut cmd = Command::cargo_bin("meros").unwrap();
    cmd.env("MEROS_HOME", env.root())
        .env_remove("MEROS_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_align_publishes_partitions() -> Result<()> {
    let env = TestEnvironment::new()?;
    let (r1, r2) = write_paired_fastq(&env.input_dir(), 30, 40)?;
    let bwa = write_script(env.root(), "bwa", STUB_BWA)?;

    meros_cmd(&env)
        .arg("align")
        .arg(&r1)
        .arg(&r2)
        .arg("-r").arg(env.root().join("ref.fa"))
        .arg("-o").arg(env.shared_dir())
        .arg("--bwa").arg(&bwa)
        .arg("--tmp-dir").arg(env.scratch_dir())
        .args(["-p", "3", "--app-name", "app", "--app-id", "9", "-j", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Published 3 SAM file(s)"));

    assert_eq!(
        env.list_files(&env.shared_dir())?,
        vec!["app-9-0.sam", "app-9-1.sam", "app-9-2.sam"]
    );
    for name in env.list_files(&env.shared_dir())? {
        let sam = fs::read_to_string(env.shared_dir().join(name))?;
        assert_eq!(sam.lines().filter(|l| !l.starts_with('@')).count(), 10);
    }
    assert!(env.list_files(&env.scratch_dir())?.is_empty());
    Ok(())
}

#[test]
fn test_missing_reference_is_configuration_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    let reads = write_single_fastq(&env.input_dir(), 4, 30)?;

    meros_cmd(&env)
        .arg("align")
        .arg(&reads)
        .arg("-o").arg(env.shared_dir())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("aligner.reference is required"));
    Ok(())
}

#[test]
fn test_missing_binary_is_tool_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    let reads = write_single_fastq(&env.input_dir(), 4, 30)?;

    meros_cmd(&env)
        .arg("align")
        .arg(&reads)
        .arg("-r").arg("ref.fa")
        .arg("-o").arg(env.shared_dir())
        .args(["--bwa", "/nonexistent/bwa"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("aligner binary not found"));
    Ok(())
}

#[test]
fn test_failing_partitions_exit_with_partition_failure() -> Result<()> {
    let env = TestEnvironment::new()?;
    let reads = write_single_fastq(&env.input_dir(), 8, 30)?;
    let bwa = write_script(env.root(), "bwa", "#!/bin/sh\necho broken >&2\nexit 1\n")?;

    meros_cmd(&env)
        .arg("align")
        .arg(&reads)
        .arg("-r").arg("ref.fa")
        .arg("-o").arg(env.shared_dir())
        .arg("--bwa").arg(&bwa)
        .arg("--tmp-dir").arg(env.scratch_dir())
        .args(["-p", "2", "--max-attempts", "1"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("2 partition(s) could not be completed"));
    assert!(env.list_files(&env.shared_dir())?.is_empty());
    Ok(())
}

#[test]
fn test_malformed_input_exit_code() -> Result<()> {
    let env = TestEnvironment::new()?;
    let reads = env.input_dir().join("broken.fq");
    fs::write(&reads, "@r0\nACGT\n+\nII\n")?;

    meros_cmd(&env)
        .arg("partition")
        .arg(&reads)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Malformed input"));
    Ok(())
}

#[test]
fn test_partition_json_keeps_mates_together() -> Result<()> {
    let env = TestEnvironment::new()?;
    let (r1, r2) = write_paired_fastq(&env.input_dir(), 103, 40)?;

    let output = meros_cmd(&env)
        .arg("partition")
        .arg(&r1)
        .arg(&r2)
        .args(["-p", "5", "-a", "aln", "--json"])
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["requested"], 5);
    assert_eq!(report["total_records"], 103);
    let partitions = report["partitions"].as_array().unwrap();
    let counts: Vec<u64> = partitions
        .iter()
        .map(|p| p["read1"]["record_count"].as_u64().unwrap())
        .collect();
    assert_eq!(counts, vec![21, 21, 21, 20, 20]);
    for p in partitions {
        assert_eq!(p["read1"]["first_record"], p["read2"]["first_record"]);
        assert_eq!(p["stages"].as_array().unwrap().len(), 3);
    }
    Ok(())
}

#[test]
fn test_exec_forwards_exit_code() -> Result<()> {
    let env = TestEnvironment::new()?;
    let bwa = write_script(env.root(), "bwa", STUB_BWA)?;

    meros_cmd(&env)
        .arg("exec")
        .arg("--bwa").arg(&bwa)
        .args(["fail", "-x"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("stub failure"));
    Ok(())
}

#[test]
fn test_config_init_and_reload() -> Result<()> {
    let env = TestEnvironment::new()?;

    meros_cmd(&env)
        .args(["config", "--example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[job]").and(predicate::str::contains("app_name = \"meros\"")));

    meros_cmd(&env)
        .args(["-j", "3", "config", "--init"])
        .assert()
        .success();
    let written = fs::read_to_string(env.root().join("config.toml"))?;
    assert!(written.contains("workers = 3"));

    // The default file is picked up by later commands
    meros_cmd(&env)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("workers = 3"));
    Ok(())
}

/// Stand-in for a long `bwa mem` that announces when it has started
const SLOW_BWA: &str = r#"#!/bin/sh
: > "$MEROS_STUB_STARTED"
exec sleep 30
"#;

fn wait_for(deadline: Duration, mut ready: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < deadline {
        if ready() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

#[test]
fn test_interrupt_cancels_run_and_cleans_scratch() -> Result<()> {
    let env = TestEnvironment::new()?;
    let (r1, r2) = write_paired_fastq(&env.input_dir(), 20, 40)?;
    let bwa = write_script(env.root(), "bwa", SLOW_BWA)?;
    let started = env.root().join("started");

    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("meros"))
        .arg("align")
        .arg(&r1)
        .arg(&r2)
        .arg("-r").arg("ref.fa")
        .arg("-o").arg(env.shared_dir())
        .arg("--bwa").arg(&bwa)
        .arg("--tmp-dir").arg(env.scratch_dir())
        .args(["-p", "2", "-j", "2"])
        .env("MEROS_HOME", env.root())
        .env("MEROS_STUB_STARTED", &started)
        .env_remove("MEROS_CONFIG")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    assert!(wait_for(Duration::from_secs(20), || started.exists()), "aligner never started");
    let status = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()?;
    assert!(status.success());

    let mut exit = None;
    assert!(
        wait_for(Duration::from_secs(20), || {
            exit = child.try_wait().ok().flatten();
            exit.is_some()
        }),
        "meros did not stop after SIGINT"
    );
    assert_eq!(exit.and_then(|s| s.code()), Some(130));
    assert!(env.list_files(&env.scratch_dir())?.is_empty());
    assert!(env.list_files(&env.shared_dir())?.is_empty());
    Ok(())
}

#[test]
fn test_same_scratch_and_output_dir_is_rejected() -> Result<()> {
    let env = TestEnvironment::new()?;
    let reads = write_single_fastq(&env.input_dir(), 6, 30)?;
    let bwa = write_script(env.root(), "bwa", STUB_BWA)?;

    meros_cmd(&env)
        .arg("align")
        .arg(&reads)
        .arg("-r").arg("ref.fa")
        .arg("-o").arg(env.shared_dir())
        .arg("--tmp-dir").arg(env.shared_dir())
        .arg("--bwa").arg(&bwa)
        .args(["-p", "2"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("must differ"));
    assert!(env.list_files(&env.shared_dir())?.is_empty());
    Ok(())
}

#[test]
fn test_app_id_with_separator_is_rejected() -> Result<()> {
    let env = TestEnvironment::new()?;
    let reads = write_single_fastq(&env.input_dir(), 4, 30)?;

    meros_cmd(&env)
        .arg("align")
        .arg(&reads)
        .arg("-r").arg("ref.fa")
        .arg("-o").arg(env.shared_dir())
        .args(["--app-id", "a/b"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("job.app_id"));
    Ok(())
}
