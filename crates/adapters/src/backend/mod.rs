// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The CLI backend capability set (C2): argv construction, stdin frame
//! formatting, raw record → normalized event translation, session id
//! extraction, and executable discovery.
//!
//! Modeled as a small trait so the supervisor's one-shot analysis call can
//! reuse the same backend the runner uses for long-lived agents.

mod claude;

pub use claude::ClaudeBackend;

use tc_core::{NormalizedEvent, PermissionMode, Request};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("executable not found on PATH or in known install locations")]
    ExecutableNotFound,
    #[error("malformed raw event: {0}")]
    MalformedEvent(String),
}

/// Capability set implemented by a single CLI backend today (`claude`), but
/// modeled as a trait so it can be swapped or mocked.
pub trait AgentBackend: Send + Sync {
    /// Build argv for streaming JSON I/O, given a request.
    fn build_args(&self, req: &Request) -> Vec<String>;

    /// Format the stdin frame for a prompt, sanitizing it first.
    fn format_stdin_input(&self, prompt: &str) -> String;

    /// Parse one raw JSON record into a normalized event, or `None` for an
    /// unrecognized record type.
    fn parse_event(&self, raw: &serde_json::Value) -> Option<NormalizedEvent>;

    /// Extract the session id, if this record carries one (`system/init` only).
    fn extract_session_id(&self, raw: &serde_json::Value) -> Option<String>;

    /// Locate the backend executable, probing platform-specific install
    /// locations before falling back to PATH.
    fn executable_path(&self) -> Result<String, BackendError>;

    /// Whether prompts must be delivered as a stdin frame rather than argv.
    fn requires_stdin_input(&self) -> bool;

    /// Argv for a one-shot, non-persisted invocation (used by the supervisor).
    fn build_analysis_args(&self) -> Vec<String>;
}

/// Map a [`PermissionMode`] to its CLI flag(s).
pub(crate) fn permission_mode_args(mode: PermissionMode) -> Vec<String> {
    match mode {
        PermissionMode::Bypass => vec!["--dangerously-skip-permissions".to_string()],
        PermissionMode::Interactive => {
            vec!["--permission-mode".to_string(), "acceptEdits".to_string()]
        }
    }
}
