// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn init_event_round_trips_through_json() {
    let ev = NormalizedEvent::Init {
        session_id: "s1".into(),
        model: "m".into(),
        tools: vec!["Bash".into()],
    };
    let json = serde_json::to_string(&ev).unwrap();
    assert!(json.contains("\"type\":\"init\""));
    let back: NormalizedEvent = serde_json::from_str(&json).unwrap();
    match back {
        NormalizedEvent::Init { session_id, .. } => assert_eq!(session_id, "s1"),
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn step_complete_defaults_permission_denials_to_empty() {
    let json = r#"{"type":"step_complete"}"#;
    let ev: NormalizedEvent = serde_json::from_str(json).unwrap();
    match ev {
        NormalizedEvent::StepComplete {
            permission_denials, ..
        } => assert!(permission_denials.is_empty()),
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn request_permission_mode_serializes_snake_case() {
    let json = serde_json::to_string(&PermissionMode::Bypass).unwrap();
    assert_eq!(json, "\"bypass\"");
    let json = serde_json::to_string(&PermissionMode::Interactive).unwrap();
    assert_eq!(json, "\"interactive\"");
}
