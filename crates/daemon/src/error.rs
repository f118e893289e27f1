// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not resolve a data directory (set HOME or XDG_DATA_HOME)")]
    NoDataDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] crate::protocol_wire::ProtocolError),
    #[error("another daemon is already listening on this socket")]
    AlreadyRunning,
}
