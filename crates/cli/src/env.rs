// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment knobs for the CLI binary itself (not the daemon's).

use std::path::PathBuf;

/// Override for locating the `tided` binary, mainly useful in dev builds
/// where it doesn't sit next to the installed `tide` binary.
pub fn daemon_binary() -> Option<String> {
    std::env::var("TIDE_DAEMON_BIN").ok()
}

pub fn cargo_manifest_dir() -> Option<String> {
    std::env::var("CARGO_MANIFEST_DIR").ok()
}

/// Timeout in milliseconds for a single IPC round trip, overridable via
/// `TIDE_TIMEOUT_IPC_MS`.
pub fn timeout_ipc_ms() -> u64 {
    std::env::var("TIDE_TIMEOUT_IPC_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(5_000)
}

/// Timeout in milliseconds to wait for a freshly spawned daemon to start
/// accepting connections, overridable via `TIDE_TIMEOUT_CONNECT_MS`.
pub fn timeout_connect_ms() -> u64 {
    std::env::var("TIDE_TIMEOUT_CONNECT_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(5_000)
}

pub fn poll_interval_ms() -> u64 {
    std::env::var("TIDE_CONNECT_POLL_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(50)
}

pub fn state_dir() -> Result<PathBuf, crate::client::ClientError> {
    tc_daemon::env::data_dir().map_err(|_| crate::client::ClientError::NoStateDir)
}
