//! Exit code contract of the `fly` binary.

use assert_cmd::Command;
use predicates::prelude::*;

const POD: &str = "6a9d3b4e-3c0f-4f38-9d5e-0f8b6f3e2a11";

fn fly() -> Command {
    let mut cmd = Command::cargo_bin("fly").unwrap();
    cmd.env_remove("FLY_POD_ROOT")
        .env_remove("FLY_MOUNTINFO")
        .env_remove("FLY_LOCK_FD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn run_rejects_malformed_uuid() {
    fly()
        .args(["run", "not-a-uuid"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("UUID is missing or malformed"));
}

#[test]
fn run_rejects_missing_uuid() {
    fly().arg("run").assert().code(1);
}

#[test]
fn gc_rejects_malformed_uuid() {
    fly().args(["gc", "1234"]).assert().code(1);
}

#[test]
fn run_fails_to_load_missing_pod() {
    let dir = tempfile::tempdir().unwrap();
    fly()
        .args(["run", POD])
        .arg("--pod-root")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load pod"));
}

#[test]
fn gc_with_nothing_to_collect_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let mountinfo = dir.path().join("mountinfo");
    std::fs::write(
        &mountinfo,
        "22 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw\n\
         71 22 0:39 / /var/lib/fly rw,relatime shared:26 -\n",
    )
    .unwrap();

    fly()
        .args(["gc", POD])
        .env("FLY_MOUNTINFO", &mountinfo)
        .assert()
        .success();
}

fn empty_pod_table(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let mountinfo = dir.path().join("mountinfo");
    std::fs::write(&mountinfo, "22 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw\n").unwrap();
    mountinfo
}

#[test]
fn rust_log_enables_debug_output() {
    let dir = tempfile::tempdir().unwrap();
    fly()
        .args(["gc", POD])
        .env("FLY_MOUNTINFO", empty_pod_table(&dir))
        .env("RUST_LOG", "fly=debug")
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG").and(predicate::str::contains("No mounts to collect")));
}

#[test]
fn quiet_by_default() {
    let dir = tempfile::tempdir().unwrap();
    fly()
        .args(["gc", POD])
        .env("FLY_MOUNTINFO", empty_pod_table(&dir))
        .assert()
        .success()
        .stderr(predicate::str::contains("No mounts to collect").not());
}

#[test]
fn gc_with_malformed_table_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mountinfo = dir.path().join("mountinfo");
    std::fs::write(&mountinfo, "garbage\n").unwrap();

    fly()
        .args(["gc", "--match", "segment", POD])
        .arg("--mountinfo")
        .arg(&mountinfo)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Malformed mount table line 1"));
}

#[test]
fn help_lists_commands() {
    fly()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run").and(predicate::str::contains("gc")));
}
