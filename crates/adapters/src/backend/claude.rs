// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `claude` CLI backend: the only implementation of [`AgentBackend`]
//! today, also reused verbatim by the supervisor for one-shot analysis
//! calls.

use std::path::Path;

use serde_json::Value;
use tc_core::{NormalizedEvent, Request, TokenUsage};

use super::{permission_mode_args, AgentBackend, BackendError};
use crate::sanitize::sanitize;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeBackend;

fn get_str<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

impl AgentBackend for ClaudeBackend {
    fn build_args(&self, req: &Request) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--verbose".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--input-format".to_string(),
            "stream-json".to_string(),
        ];

        if let Some(session_id) = &req.session_id {
            args.push("--resume".to_string());
            args.push(session_id.clone());
        }

        args.extend(permission_mode_args(req.permission_mode));

        if let Some(model) = &req.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        if req.use_chrome.unwrap_or(false) {
            args.push("--chrome".to_string());
        }

        if let Some(system_prompt) = &req.system_prompt {
            if req.session_id.is_some() {
                args.push("--append-system-prompt".to_string());
            } else {
                args.push("--system-prompt".to_string());
            }
            args.push(system_prompt.clone());
        }

        let tools_disabled = req
            .backend_specific_config
            .as_ref()
            .and_then(|cfg| cfg.get("tools_disabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if tools_disabled {
            args.push("--tools".to_string());
            args.push(String::new());
        }

        args
    }

    fn format_stdin_input(&self, prompt: &str) -> String {
        let frame = serde_json::json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": sanitize(prompt),
            },
        });
        frame.to_string()
    }

    fn parse_event(&self, raw: &Value) -> Option<NormalizedEvent> {
        let record_type = get_str(raw, "type")?;
        match record_type {
            "system" => parse_system(raw),
            "assistant" => parse_assistant(raw),
            "tool_use" => parse_tool_use(raw),
            "result" => parse_result(raw),
            "stream_event" => parse_stream_event(raw),
            _ => None,
        }
    }

    fn extract_session_id(&self, raw: &Value) -> Option<String> {
        if get_str(raw, "type") != Some("system") || get_str(raw, "subtype") != Some("init") {
            return None;
        }
        get_str(raw, "session_id").map(str::to_string)
    }

    fn executable_path(&self) -> Result<String, BackendError> {
        const CANDIDATES: &[&str] = &[
            "/usr/local/bin/claude",
            "/opt/homebrew/bin/claude",
            "/usr/bin/claude",
        ];
        for candidate in CANDIDATES {
            if Path::new(candidate).exists() {
                return Ok((*candidate).to_string());
            }
        }
        Ok("claude".to_string())
    }

    fn requires_stdin_input(&self) -> bool {
        true
    }

    fn build_analysis_args(&self) -> Vec<String> {
        vec![
            "--print".to_string(),
            "--verbose".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--input-format".to_string(),
            "stream-json".to_string(),
            "--no-session-persistence".to_string(),
        ]
    }
}

fn parse_system(raw: &Value) -> Option<NormalizedEvent> {
    match get_str(raw, "subtype")? {
        "init" => Some(NormalizedEvent::Init {
            session_id: get_str(raw, "session_id")?.to_string(),
            model: get_str(raw, "model").unwrap_or_default().to_string(),
            tools: raw
                .get("tools")
                .and_then(Value::as_array)
                .map(|tools| tools.iter().filter_map(|t| t.as_str().map(String::from)).collect())
                .unwrap_or_default(),
        }),
        "error" => Some(NormalizedEvent::Error {
            error_message: get_str(raw, "message").unwrap_or("unknown error").to_string(),
        }),
        _ => None,
    }
}

fn parse_assistant(raw: &Value) -> Option<NormalizedEvent> {
    let blocks = raw.get("message")?.get("content")?.as_array()?;
    for block in blocks {
        match get_str(block, "type") {
            Some("thinking") => {
                let text = get_str(block, "thinking").or_else(|| get_str(block, "text")).unwrap_or("");
                if !text.is_empty() {
                    return Some(NormalizedEvent::Thinking {
                        text: text.to_string(),
                        is_streaming: false,
                        uuid: get_str(block, "uuid").map(String::from),
                    });
                }
            }
            Some("text") => {
                let text = get_str(block, "text").unwrap_or("");
                if !text.is_empty() {
                    return Some(NormalizedEvent::Text {
                        text: text.to_string(),
                        is_streaming: false,
                        uuid: get_str(block, "uuid").map(String::from),
                    });
                }
            }
            Some("tool_use") => {
                return Some(NormalizedEvent::ToolStart {
                    tool_name: get_str(block, "name").unwrap_or_default().to_string(),
                    tool_input: block.get("input").cloned(),
                    subagent_name: block
                        .get("input")
                        .and_then(|i| get_str(i, "description"))
                        .map(String::from),
                    uuid: get_str(block, "uuid").map(String::from),
                });
            }
            _ => continue,
        }
    }
    None
}

fn parse_tool_use(raw: &Value) -> Option<NormalizedEvent> {
    match get_str(raw, "subtype")? {
        "input" => Some(NormalizedEvent::ToolStart {
            tool_name: get_str(raw, "tool_name").unwrap_or_default().to_string(),
            tool_input: raw.get("input").cloned(),
            subagent_name: None,
            uuid: get_str(raw, "uuid").map(String::from),
        }),
        "result" => {
            let output = raw.get("output").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            Some(NormalizedEvent::ToolResult {
                tool_name: get_str(raw, "tool_name").unwrap_or_default().to_string(),
                tool_output: output,
                uuid: get_str(raw, "uuid").map(String::from),
            })
        }
        _ => None,
    }
}

fn parse_result(raw: &Value) -> Option<NormalizedEvent> {
    let tokens = raw.get("usage").map(|u| TokenUsage {
        input: u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
        output: u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
        cache_creation: u.get("cache_creation_input_tokens").and_then(Value::as_u64),
        cache_read: u.get("cache_read_input_tokens").and_then(Value::as_u64),
    });

    Some(NormalizedEvent::StepComplete {
        duration_ms: raw.get("duration_ms").and_then(Value::as_u64),
        cost: raw.get("total_cost_usd").and_then(Value::as_f64),
        tokens,
        result_text: get_str(raw, "result").map(String::from),
        permission_denials: raw
            .get("permission_denials")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default(),
    })
}

fn parse_stream_event(raw: &Value) -> Option<NormalizedEvent> {
    let event = raw.get("event")?;
    match get_str(event, "type")? {
        "content_block_delta" => {
            let delta = event.get("delta")?;
            match get_str(delta, "type")? {
                "text_delta" => Some(NormalizedEvent::Text {
                    text: get_str(delta, "text").unwrap_or_default().to_string(),
                    is_streaming: true,
                    uuid: None,
                }),
                "thinking_delta" => Some(NormalizedEvent::Thinking {
                    text: get_str(delta, "thinking").unwrap_or_default().to_string(),
                    is_streaming: true,
                    uuid: None,
                }),
                _ => None,
            }
        }
        "content_block_start" => {
            let block_type = get_str(event.get("content_block")?, "type")?;
            if block_type == "text" || block_type == "thinking" {
                Some(NormalizedEvent::BlockStart {
                    block_type: block_type.to_string(),
                })
            } else {
                None
            }
        }
        "content_block_stop" => Some(NormalizedEvent::BlockEnd {}),
        _ => None,
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
