// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The recovery snapshot: the live-process table serialized to disk.

use serde::{Deserialize, Serialize};

use crate::{AgentId, Request};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryEntry {
    pub agent_id: AgentId,
    pub pid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub last_request: Request,
    pub start_time_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoverySnapshot {
    pub entries: Vec<RecoveryEntry>,
}
