// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start/stop/probe utilities for the background `tided` process.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use crate::client::ClientError;

/// Spawn `tided` in the background, detached from the CLI's stdio.
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let tided_path = find_tided_binary();

    Command::new(&tided_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Locate the `tided` binary: explicit override, a sibling of the dev
/// build's `target/debug`, a sibling of the running `tide` binary, or
/// fall back to `$PATH` resolution.
fn find_tided_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }

    let current_exe = std::env::current_exe().ok();
    let is_debug_build = current_exe.as_ref().and_then(|p| p.to_str()).is_some_and(|s| s.contains("target/debug"));

    if is_debug_build {
        if let Some(manifest_dir) = crate::env::cargo_manifest_dir() {
            let dev_path = PathBuf::from(manifest_dir).parent().and_then(|p| p.parent()).map(|p| p.join("target/debug/tided"));
            if let Some(path) = dev_path {
                if path.exists() {
                    return path;
                }
            }
        }
    }

    if let Some(ref exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("tided");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("tided")
}

pub fn daemon_dir() -> Result<PathBuf, ClientError> {
    crate::env::state_dir()
}

pub fn daemon_socket() -> Result<PathBuf, ClientError> {
    Ok(tc_daemon::env::socket_path(&daemon_dir()?))
}

/// Read the daemon's PID from its PID file, if present.
pub fn read_daemon_pid() -> Result<Option<u32>, ClientError> {
    let pid_path = tc_daemon::env::pid_path(&daemon_dir()?);
    match std::fs::read_to_string(&pid_path) {
        Ok(content) => Ok(content.trim().parse::<u32>().ok()),
        Err(_) => Ok(None),
    }
}

/// Probe whether a Unix socket is accepting connections.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Remove a stale socket file left behind by a daemon that no longer answers.
pub fn cleanup_stale_socket() -> Result<(), ClientError> {
    let socket_path = daemon_socket()?;
    if socket_path.exists() && !probe_socket(&socket_path) {
        let _ = std::fs::remove_file(&socket_path);
    }
    Ok(())
}

/// Send SIGTERM to the daemon and wait for it to exit, falling back to
/// SIGKILL after the configured exit timeout.
pub fn stop_daemon(pid: u32) {
    kill_signal("-15", pid);

    let start = Instant::now();
    let timeout = Duration::from_millis(crate::env::timeout_connect_ms());
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    if process_exists(pid) {
        kill_signal("-9", pid);
    }
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}
