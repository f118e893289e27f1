// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor report and per-agent analysis/history types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Healthy,
    AttentionNeeded,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentProgress {
    OnTrack,
    Stalled,
    Blocked,
    Completed,
    Idle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAnalysis {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub status_description: String,
    pub progress: AgentProgress,
    pub recent_work_summary: String,
    #[serde(default)]
    pub concerns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorReport {
    pub id: String,
    pub timestamp_ms: u64,
    pub agent_summaries: Vec<AgentAnalysis>,
    pub overall_status: OverallStatus,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// One entry in a per-agent supervisor history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorHistoryEntry {
    pub id: String,
    pub timestamp_ms: u64,
    pub report_id: String,
    pub analysis: AgentAnalysis,
}

/// Per-agent ordered history, capped at [`SupervisorHistory::CAP`] entries
/// per agent, persisted to `supervisor-history.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisorHistory {
    pub histories: HashMap<String, Vec<SupervisorHistoryEntry>>,
    pub saved_at_ms: u64,
    pub version: u32,
}

impl SupervisorHistory {
    pub const CAP: usize = 50;

    pub fn record(&mut self, agent_id: &AgentId, entry: SupervisorHistoryEntry) {
        let list = self.histories.entry(agent_id.as_str().to_string()).or_default();
        list.push(entry);
        if list.len() > Self::CAP {
            let overflow = list.len() - Self::CAP;
            list.drain(0..overflow);
        }
    }
}
