// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC request/response shapes exchanged with `tide` (the CLI) over the
//! daemon's Unix socket.

use serde::{Deserialize, Serialize};
use tc_core::{AgentId, DeathRecord, NormalizedEvent, Request as RunRequest, SupervisorReport};
use tc_core::supervisor::SupervisorHistoryEntry;
use tc_runner::ActiveProcessInfo;

/// One request frame. `Run` is the only request answered with more than one
/// response frame: the connection stays open, streaming `Event`/`Output`
/// frames until a final `Complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Run(RunRequest),
    Stop { agent_id: AgentId },
    Interrupt { agent_id: AgentId },
    SendMessage { agent_id: AgentId, message: String },
    Status,
    DeathHistory,
    LatestReport,
    GenerateReport,
    SupervisorHistory { agent_id: AgentId },
    Tail { agent_id: AgentId },
    Shutdown,
}

/// One response frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,
    Ok,
    Error { message: String },
    Status { agents: Vec<ActiveProcessInfo> },
    DeathHistory { deaths: Vec<DeathRecord> },
    Report { report: Option<SupervisorReport> },
    History { entries: Vec<SupervisorHistoryEntry> },
    Tail { data: String },
    ShuttingDown,
    /// Streamed while a `Run` request is in flight.
    Event { agent_id: AgentId, event: NormalizedEvent },
    /// Streamed while a `Run` request is in flight (raw/banner output lines).
    Output { agent_id: AgentId, line: String },
    /// Final frame for a `Run` request.
    Complete { agent_id: AgentId, success: bool },
}
