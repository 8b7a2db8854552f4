use std::process::Command;
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_split-downloader");

#[test]
fn should_report_failure_once_with_non_zero_exit() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("data.bin"), b"keep").unwrap();

    let output = Command::new(BIN)
        .arg("-d")
        .arg(dir.path())
        .arg("http://127.0.0.1:9/files/data.bin")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Target file already exists").count(), 1, "{stderr}");
    assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), b"keep");
}

#[test]
fn should_reject_zero_split_before_running() {
    let dir = TempDir::new().unwrap();

    let output = Command::new(BIN)
        .args(["-s", "0", "-d"])
        .arg(dir.path())
        .arg("http://127.0.0.1:9/files/data.bin")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}
