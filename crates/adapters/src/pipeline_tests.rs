// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::backend::ClaudeBackend;

#[test]
fn non_json_line_becomes_raw_output() {
    let mut pipeline = StdoutPipeline::new();
    let outcome = pipeline.process_line("not json at all", &ClaudeBackend);
    assert_eq!(outcome.outputs, vec![OutputFrame::Raw("[raw] not json at all".to_string())]);
    assert!(outcome.event.is_none());
}

#[test]
fn happy_turn_produces_banner_text_tokens_and_cost() {
    let mut pipeline = StdoutPipeline::new();
    let backend = ClaudeBackend;

    let init = pipeline.process_line(
        r#"{"type":"system","subtype":"init","session_id":"s1","model":"m","tools":[]}"#,
        &backend,
    );
    assert_eq!(init.session_id, Some("s1".to_string()));
    assert_eq!(init.outputs, vec![OutputFrame::Banner("Session started: s1 (m)".to_string())]);

    let text = pipeline.process_line(
        r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hello"}]}}"#,
        &backend,
    );
    assert_eq!(
        text.outputs,
        vec![OutputFrame::Text {
            text: "hello".to_string(),
            is_streaming: false,
            subagent_name: None,
            uuid: None,
        }]
    );

    let result = pipeline.process_line(
        r#"{"type":"result","total_cost_usd":0.01,"usage":{"input_tokens":10,"output_tokens":2}}"#,
        &backend,
    );
    assert_eq!(
        result.outputs,
        vec![OutputFrame::Tokens("Tokens: 10 in, 2 out".to_string()), OutputFrame::Cost("Cost: $0.0100".to_string())]
    );
}

#[test]
fn result_text_suppressed_when_text_already_emitted_this_turn() {
    let mut pipeline = StdoutPipeline::new();
    let backend = ClaudeBackend;
    pipeline.process_line(
        r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hello"}]}}"#,
        &backend,
    );
    let result = pipeline.process_line(r#"{"type":"result","result":"hello"}"#, &backend);
    assert!(!result
        .outputs
        .iter()
        .any(|o| matches!(o, OutputFrame::Text { .. })));
}

#[test]
fn result_text_emitted_as_fallback_when_no_text_this_turn() {
    let mut pipeline = StdoutPipeline::new();
    let backend = ClaudeBackend;
    let result = pipeline.process_line(r#"{"type":"result","result":"fallback answer"}"#, &backend);
    assert!(result
        .outputs
        .iter()
        .any(|o| matches!(o, OutputFrame::Text { text, .. } if text == "fallback answer")));
}

#[test]
fn back_to_back_step_completes_each_emit_their_own_result_text() {
    let mut pipeline = StdoutPipeline::new();
    let backend = ClaudeBackend;
    let first = pipeline.process_line(r#"{"type":"result","result":"first"}"#, &backend);
    let second = pipeline.process_line(r#"{"type":"result","result":"second"}"#, &backend);
    assert!(first.outputs.iter().any(|o| matches!(o, OutputFrame::Text { text, .. } if text == "first")));
    assert!(second.outputs.iter().any(|o| matches!(o, OutputFrame::Text { text, .. } if text == "second")));
}

#[test]
fn task_tool_start_tracks_active_subagent_until_result() {
    let mut pipeline = StdoutPipeline::new();
    let backend = ClaudeBackend;
    pipeline.process_line(
        r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Task","input":{"description":"sub"}}]}}"#,
        &backend,
    );
    assert_eq!(pipeline.active_subagent(), Some("sub"));
    pipeline.process_line(r#"{"type":"tool_use","subtype":"result","tool_name":"Task"}"#, &backend);
    assert_eq!(pipeline.active_subagent(), None);
}
