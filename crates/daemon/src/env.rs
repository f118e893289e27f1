// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::DaemonError;

/// Resolve the persistence directory (spec §6):
/// `XDG_DATA_HOME/tide-commander` > `HOME/.local/share/tide-commander`.
pub fn data_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join("tide-commander"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoDataDir)?;
    Ok(PathBuf::from(home).join(".local/share/tide-commander"))
}

/// Unix socket the daemon listens on for CLI/operator connections.
pub fn socket_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("daemon.sock")
}

/// Rolling log file path.
pub fn log_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("logs").join("daemon.log")
}

/// PID file written at startup so `tide daemon stop` can find the process
/// without going through the socket.
pub fn pid_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("daemon.pid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn prefers_xdg_data_home() {
        std::env::set_var("XDG_DATA_HOME", "/tmp/xdg-test");
        assert_eq!(data_dir().unwrap(), PathBuf::from("/tmp/xdg-test/tide-commander"));
        std::env::remove_var("XDG_DATA_HOME");
    }

    #[test]
    #[serial]
    fn falls_back_to_home() {
        std::env::remove_var("XDG_DATA_HOME");
        std::env::set_var("HOME", "/tmp/home-test");
        assert_eq!(data_dir().unwrap(), PathBuf::from("/tmp/home-test/.local/share/tide-commander"));
        std::env::remove_var("HOME");
    }
}
