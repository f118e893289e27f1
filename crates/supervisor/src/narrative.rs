// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Narrative extractor (C11): turns one normalized event into at most one
//! short human-readable line, templated per event/tool kind.

use serde_json::Value;
use tc_core::{ActivityNarrative, AgentId, IdGen, NarrativeKind, NormalizedEvent, UuidIdGen};

/// Extract a narrative line for `event`, or `None` if this event kind
/// doesn't surface one (tool results, block markers, context stats).
pub fn extract(agent_id: &AgentId, event: &NormalizedEvent, timestamp_ms: u64) -> Option<ActivityNarrative> {
    let (kind, narrative, tool_name) = match event {
        NormalizedEvent::Init { .. } => (NarrativeKind::TaskStart, "Agent session started".to_string(), None),
        NormalizedEvent::ToolStart { tool_name, tool_input, subagent_name, .. } => (
            NarrativeKind::ToolUse,
            tool_start_narrative(tool_name, tool_input.as_ref(), subagent_name.as_deref()),
            Some(tool_name.clone()),
        ),
        NormalizedEvent::Text { text, is_streaming, .. } => {
            if *is_streaming || text.trim().chars().count() <= 10 {
                return None;
            }
            (NarrativeKind::Output, format!("Responding: \"{}\"", truncate(text.trim(), 100)), None)
        }
        NormalizedEvent::Thinking { text, is_streaming, .. } => {
            if *is_streaming {
                return None;
            }
            (NarrativeKind::Thinking, format!("Thinking: \"{}\"", truncate(text.trim(), 80)), None)
        }
        NormalizedEvent::Error { error_message } => {
            (NarrativeKind::Error, format!("Error occurred: {error_message}"), None)
        }
        NormalizedEvent::StepComplete { tokens, .. } => {
            let (input, output) = tokens.as_ref().map(|t| (t.input, t.output)).unwrap_or((0, 0));
            (NarrativeKind::TaskComplete, format!("Completed processing step ({input}, {output} tokens)"), None)
        }
        NormalizedEvent::ToolResult { .. }
        | NormalizedEvent::BlockStart { .. }
        | NormalizedEvent::BlockEnd {}
        | NormalizedEvent::ContextStats { .. } => return None,
    };

    Some(ActivityNarrative {
        id: UuidIdGen.next(),
        agent_id: agent_id.clone(),
        timestamp_ms,
        kind,
        narrative,
        tool_name,
    })
}

fn tool_start_narrative(tool_name: &str, tool_input: Option<&Value>, subagent_name: Option<&str>) -> String {
    let field = |key: &str| tool_input.and_then(|v| v.get(key)).and_then(Value::as_str);

    match tool_name {
        "Read" => match field("file_path").and_then(basename) {
            Some(name) => format!("Reading file \"{name}\""),
            None => "Reading a file".to_string(),
        },
        "Write" | "Edit" | "NotebookEdit" => match field("file_path").and_then(basename) {
            Some(name) => format!("Writing new content to \"{name}\""),
            None => "Writing new content".to_string(),
        },
        "Bash" => match field("command") {
            Some(cmd) => format!("Running command: {}", truncate(cmd, 60)),
            None => "Running a command".to_string(),
        },
        "Grep" => match field("pattern") {
            Some(pattern) => format!("Searching for pattern \"{}\"", truncate(pattern, 60)),
            None => "Searching for a pattern".to_string(),
        },
        "Glob" => match field("pattern") {
            Some(pattern) => format!("Finding files matching \"{}\"", truncate(pattern, 60)),
            None => "Finding files matching a pattern".to_string(),
        },
        "Task" => match subagent_name.or_else(|| field("description")) {
            Some(desc) => format!("Starting sub-task: \"{}\"", truncate(desc, 60)),
            None => "Starting a sub-task".to_string(),
        },
        "TodoWrite" => {
            let count = tool_input
                .and_then(|v| v.get("todos"))
                .and_then(Value::as_array)
                .map(|a| a.len())
                .unwrap_or(0);
            format!("Updating task list with {count} items")
        }
        "AskUserQuestion" => "Asking user a question".to_string(),
        other => format!("Using tool: {other}"),
    }
}

fn basename(path: &str) -> Option<String> {
    std::path::Path::new(path).file_name().map(|n| n.to_string_lossy().to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
#[path = "narrative_tests.rs"]
mod tests;
