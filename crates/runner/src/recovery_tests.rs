// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tc_core::{AgentId, PermissionMode, Request};
use tempfile::tempdir;

fn entry(agent: &str) -> RecoveryEntry {
    RecoveryEntry {
        agent_id: AgentId::new(agent),
        pid: 4242,
        session_id: Some("s1".to_string()),
        last_request: Request {
            agent_id: AgentId::new(agent),
            prompt: "hello".to_string(),
            working_dir: "/tmp".into(),
            session_id: Some("s1".to_string()),
            model: None,
            permission_mode: PermissionMode::Bypass,
            use_chrome: None,
            system_prompt: None,
            force_new_session: None,
            custom_agent: None,
            backend_specific_config: None,
        },
        start_time_ms: 1,
    }
}

#[test]
fn missing_file_loads_as_empty() {
    let dir = tempdir().expect("tempdir");
    let store = RecoveryStore::new(dir.path());
    assert!(store.load().expect("load").entries.is_empty());
}

#[test]
fn round_trips_entries() {
    let dir = tempdir().expect("tempdir");
    let store = RecoveryStore::new(dir.path());
    store.save(vec![entry("a")]).expect("save");
    let loaded = store.load().expect("load");
    assert_eq!(loaded.entries.len(), 1);
    assert_eq!(loaded.entries[0].agent_id, AgentId::new("a"));
}

#[test]
fn clear_empties_the_snapshot() {
    let dir = tempdir().expect("tempdir");
    let store = RecoveryStore::new(dir.path());
    store.save(vec![entry("a")]).expect("save");
    store.clear().expect("clear");
    assert!(store.load().expect("load").entries.is_empty());
}
