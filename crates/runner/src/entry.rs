// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent runtime entry (spec data model §3): everything the runner
//! tracks about one live child process.
//!
//! The `Child` handle itself is not kept here: the task that owns
//! `Child::wait()` is the sole place a process is reaped, so entries only
//! need the pid (for signaling and liveness checks) and the stdin writer.

use tc_core::{AgentId, Request};
use tokio::process::ChildStdin;
use tokio_util::sync::CancellationToken;

pub struct ActiveEntry {
    pub agent_id: AgentId,
    pub session_id: Option<String>,
    pub last_request: Request,
    pub pid: u32,
    pub start_time_ms: u64,
    pub last_activity_time_ms: u64,
    pub restart_count: u32,
    pub last_restart_time_ms: Option<u64>,
    pub last_error: Option<String>,
    /// `None` for an entry reattached from a recovery snapshot: we never
    /// held that process's original stdin, so `sendMessage` fails until it
    /// is restarted.
    pub stdin: Option<ChildStdin>,
    /// Cancelled by `stop()` so this run's stdout/stderr readers exit
    /// immediately instead of racing the kill signal and the next run of
    /// the same agent id.
    pub io_cancel: CancellationToken,
}
