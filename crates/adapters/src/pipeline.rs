// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stdout Pipeline (C3): decode one line of a child's stdout into a
//! normalized event plus the output frames an observer should see.
//!
//! This is pure translation — no process or bus ownership. The runner
//! reads lines off the child's stdout, feeds them through `process_line`,
//! and is responsible for emitting the resulting event on the internal bus
//! and forwarding the output frames to `RunnerCallbacks`.

use serde_json::Value;
use tc_core::NormalizedEvent;
use tracing::debug;

use crate::backend::AgentBackend;

/// One translated piece of output the runner should forward to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFrame {
    Banner(String),
    Text {
        text: String,
        is_streaming: bool,
        subagent_name: Option<String>,
        uuid: Option<String>,
    },
    ToolStart(String),
    ToolInput(String),
    ToolResult(String),
    Tokens(String),
    Cost(String),
    ContextStats(Value),
    Error(String),
    Raw(String),
}

/// The outcome of decoding a single line.
#[derive(Debug, Default)]
pub struct LineOutcome {
    pub session_id: Option<String>,
    pub event: Option<NormalizedEvent>,
    pub outputs: Vec<OutputFrame>,
}

/// Per-child decode state: the line buffer's owner (the runner) drives one
/// of these per active process.
#[derive(Debug, Default)]
pub struct StdoutPipeline {
    active_subagent: Option<String>,
    text_emitted_in_turn: bool,
}

impl StdoutPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_subagent(&self) -> Option<&str> {
        self.active_subagent.as_deref()
    }

    /// Decode one already-trimmed, non-empty line.
    pub fn process_line(&mut self, line: &str, backend: &dyn AgentBackend) -> LineOutcome {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, len = line.len(), "stdout line was not JSON, passing through raw");
                return LineOutcome {
                    outputs: vec![OutputFrame::Raw(format!("[raw] {line}"))],
                    ..Default::default()
                }
            }
        };

        let session_id = backend.extract_session_id(&raw);
        let event = backend.parse_event(&raw);
        let outputs = match &event {
            Some(event) => self.translate(event),
            None => Vec::new(),
        };

        LineOutcome {
            session_id,
            event,
            outputs,
        }
    }

    /// Flush any trailing partial line (stdout EOF without a final `\n`).
    pub fn flush_partial(&mut self, partial: &str, backend: &dyn AgentBackend) -> LineOutcome {
        if partial.trim().is_empty() {
            return LineOutcome::default();
        }
        self.process_line(partial.trim(), backend)
    }

    fn translate(&mut self, event: &NormalizedEvent) -> Vec<OutputFrame> {
        match event {
            NormalizedEvent::Init { session_id, model, .. } => {
                vec![OutputFrame::Banner(format!("Session started: {session_id} ({model})"))]
            }
            NormalizedEvent::Text { text, is_streaming, uuid } => {
                self.text_emitted_in_turn = true;
                vec![OutputFrame::Text {
                    text: text.clone(),
                    is_streaming: *is_streaming,
                    subagent_name: self.active_subagent.clone(),
                    uuid: uuid.clone(),
                }]
            }
            NormalizedEvent::Thinking { text, is_streaming, uuid } => {
                vec![OutputFrame::Text {
                    text: text.clone(),
                    is_streaming: *is_streaming,
                    subagent_name: self.active_subagent.clone(),
                    uuid: uuid.clone(),
                }]
            }
            NormalizedEvent::ToolStart {
                tool_name,
                tool_input,
                subagent_name,
                ..
            } => {
                if tool_name == "Task" {
                    self.active_subagent = subagent_name.clone();
                }
                let mut outputs = vec![OutputFrame::ToolStart(format!("Using tool: {tool_name}"))];
                if let Some(input) = tool_input {
                    outputs.push(OutputFrame::ToolInput(format!("Tool input: {input}")));
                }
                outputs
            }
            NormalizedEvent::ToolResult { tool_name, tool_output, .. } => {
                let mut outputs = Vec::new();
                if tool_name == "Bash" {
                    if let Some(output) = tool_output {
                        outputs.push(OutputFrame::ToolResult(format!("Bash output: {output}")));
                    }
                } else if tool_name == "Task" {
                    self.active_subagent = None;
                }
                outputs
            }
            NormalizedEvent::StepComplete {
                result_text,
                tokens,
                cost,
                ..
            } => {
                let mut outputs = Vec::new();
                if let Some(text) = result_text {
                    if !self.text_emitted_in_turn {
                        outputs.push(OutputFrame::Text {
                            text: text.clone(),
                            is_streaming: false,
                            subagent_name: self.active_subagent.clone(),
                            uuid: None,
                        });
                    }
                }
                self.text_emitted_in_turn = false;
                if let Some(tokens) = tokens {
                    outputs.push(OutputFrame::Tokens(format!(
                        "Tokens: {} in, {} out",
                        tokens.input, tokens.output
                    )));
                }
                if let Some(cost) = cost {
                    outputs.push(OutputFrame::Cost(format!("Cost: ${cost:.4}")));
                }
                outputs
            }
            NormalizedEvent::BlockStart { .. } | NormalizedEvent::BlockEnd {} => Vec::new(),
            NormalizedEvent::ContextStats { context_stats_raw } => {
                vec![OutputFrame::ContextStats(context_stats_raw.clone())]
            }
            NormalizedEvent::Error { error_message } => {
                vec![OutputFrame::Error(error_message.clone())]
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
