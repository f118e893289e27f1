//! Daemon lifecycle specs: start/stop/status and the files it leaves behind.

use crate::prelude::*;

fn data_dir(project: &Project) -> std::path::PathBuf {
    project.state_path().join("tide-commander")
}

#[test]
fn status_reports_not_running_before_start() {
    let project = Project::empty();
    project.tide().args(&["status"]).fails().stderr_has("daemon not running");
}

#[test]
fn daemon_status_reports_not_running_before_start() {
    let project = Project::empty();
    project.tide().args(&["daemon", "status"]).passes().stdout_has("daemon not running");
}

#[test]
fn daemon_start_reports_success() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes().stdout_has("daemon started");
}

#[test]
fn daemon_status_shows_running_after_start() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();

    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });
    assert!(running, "daemon should report running after start\nlog:\n{}", project.daemon_log());
}

#[test]
fn daemon_creates_socket_file() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();

    let socket_path = data_dir(&project).join("daemon.sock");
    let created = wait_for(SPEC_WAIT_MAX_MS, || socket_path.exists());
    assert!(created, "daemon socket file should exist");
}

#[test]
fn daemon_creates_pid_file() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();

    let pid_path = data_dir(&project).join("daemon.pid");
    let created = wait_for(SPEC_WAIT_MAX_MS, || pid_path.exists());
    assert!(created, "daemon pid file should exist");
}

#[test]
fn daemon_stop_reports_success() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();

    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });
    assert!(running);

    project.tide().args(&["daemon", "stop"]).passes().stdout_has("daemon shutting down");
}

#[test]
fn daemon_status_reports_not_running_after_stop() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });

    project.tide().args(&["daemon", "stop"]).passes();

    let stopped = wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon not running")
    });
    assert!(stopped, "daemon should report not running after stop");
}

/// Running `tide daemon start` while a daemon is already listening must be a
/// no-op that leaves the existing daemon untouched.
#[test]
fn starting_daemon_twice_does_not_disrupt_it() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });

    project.tide().args(&["daemon", "start"]).passes().stdout_has("daemon already running");

    project.tide().args(&["daemon", "status"]).passes().stdout_has("daemon running");
}

/// After a clean stop, the socket and pid file must not block a fresh start.
#[test]
fn daemon_restarts_after_stop() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });
    project.tide().args(&["daemon", "stop"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon not running")
    });

    project.tide().args(&["daemon", "start"]).passes();
    let running_again = wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });
    assert!(running_again, "daemon should accept a fresh start after a clean stop");
}

/// A stale socket left behind by a daemon that didn't exit cleanly must not
/// block a new daemon from starting.
#[test]
fn daemon_start_clears_stale_socket() {
    let project = Project::empty();
    let dir = data_dir(&project);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("daemon.sock"), b"").unwrap();

    project.tide().args(&["daemon", "start"]).passes().stdout_has("daemon started");

    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });
    assert!(running, "daemon should start past a stale socket file\nlog:\n{}", project.daemon_log());
}

/// Running `tided` directly while a daemon is already running must fail
/// loudly instead of disrupting the running instance.
#[test]
fn running_tided_while_daemon_running_does_not_kill_it() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });

    let output = std::process::Command::new(tided_binary())
        .env("XDG_DATA_HOME", project.state_path())
        .output()
        .expect("tided should run");
    assert!(!output.status.success(), "tided should fail when a daemon is already running");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already running"), "stderr should mention 'already running', got: {stderr}");

    project.tide().args(&["daemon", "status"]).passes().stdout_has("daemon running");
    assert!(data_dir(&project).join("daemon.sock").exists(), "socket file must survive the failed tided");
    assert!(data_dir(&project).join("daemon.pid").exists(), "pid file must survive the failed tided");
}
