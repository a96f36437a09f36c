//! Command-line tests against the built `evgen-run` binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn evgen_run(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_evgen-run"));
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_unknown_generator_leaves_output_untouched() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("run.txt");
    fs::write(&out, "previous run\n").unwrap();

    let output = evgen_run(dir.path())
        .args(["pythia9", "-n", "1", "-o"])
        .arg(&out)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(fs::read_to_string(&out).unwrap(), "previous run\n");
    let log = stderr(&output);
    assert!(log.contains("pythia9"), "{}", log);
    assert!(log.contains("p1me"), "{}", log);
}

#[test]
fn test_short_run_writes_trailer() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("run.txt");

    let output = evgen_run(dir.path())
        .args(["p1", "-n", "3", "--beams", "LHC", "-o"])
        .arg(&out)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("E ")).count(), 3);
    assert_eq!(text.lines().last(), Some("END"));
}

#[cfg(unix)]
#[test]
fn test_sigterm_stops_run_cleanly() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.txt");

    let mut child = evgen_run(dir.path())
        .args(["p1", "-n", "100000000", "--beams", "LHC", "-o"])
        .arg(&out)
        .spawn()
        .unwrap();

    // Wait until events are flowing
    let deadline = Instant::now() + Duration::from_secs(30);
    while fs::metadata(&out).map_or(0, |m| m.len()) == 0 {
        assert!(Instant::now() < deadline, "no output before deadline");
        thread::sleep(Duration::from_millis(50));
    }

    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(0));
    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().last(), Some("END"));
}
