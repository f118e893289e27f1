// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run request and the normalized event sum type.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::AgentId;

/// How the backend should handle permission prompts for file edits / tool use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    /// Skip all permission prompts.
    Bypass,
    /// Auto-accept in-directory edits only; denials surface in `step_complete`.
    Interactive,
}

/// A request to run an agent, kept on the runtime entry so a restart can
/// reuse it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub agent_id: AgentId,
    pub prompt: String,
    pub working_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub permission_mode: PermissionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_chrome: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_new_session: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_specific_config: Option<serde_json::Value>,
}

/// Token usage reported on a completed step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read: Option<u64>,
}

/// The normalized event sum type every `AgentBackend` implementation parses
/// its raw wire records into. This is the only shape downstream consumers
/// (the bus, the narrative extractor, the supervisor) ever see.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NormalizedEvent {
    Init {
        session_id: String,
        model: String,
        #[serde(default)]
        tools: Vec<String>,
    },
    Text {
        text: String,
        #[serde(default)]
        is_streaming: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<String>,
    },
    Thinking {
        text: String,
        #[serde(default)]
        is_streaming: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<String>,
    },
    ToolStart {
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_input: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        subagent_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<String>,
    },
    ToolResult {
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_output: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<String>,
    },
    StepComplete {
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cost: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tokens: Option<TokenUsage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result_text: Option<String>,
        #[serde(default)]
        permission_denials: Vec<String>,
    },
    BlockStart {
        block_type: String,
    },
    BlockEnd {},
    ContextStats {
        context_stats_raw: serde_json::Value,
    },
    Error {
        error_message: String,
    },
}

/// Alias kept for readability at call sites that talk about "the event"
/// without needing the `Normalized` qualifier.
pub type Event = NormalizedEvent;

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
