// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tc_core::AgentId;

fn death(timestamp_ms: u64, exit_code: Option<i32>, signal: Option<&str>, runtime_ms: u64) -> DeathRecord {
    DeathRecord {
        agent_id: AgentId::new("a"),
        pid: 1,
        exit_code,
        signal: signal.map(str::to_string),
        runtime_ms,
        was_tracked: true,
        timestamp_ms,
        stderr_tail: None,
    }
}

#[test]
fn fewer_than_three_recent_deaths_flags_nothing() {
    let ring = vec![death(0, Some(1), None, 10_000), death(1_000, Some(1), None, 10_000)];
    assert!(analyze_crash_pattern(&ring, 2_000).is_empty());
}

#[test]
fn three_recent_deaths_with_matching_signal_flags_external_kill() {
    let ring = vec![
        death(0, None, Some("SIGKILL"), 10_000),
        death(1_000, None, Some("SIGKILL"), 10_000),
        death(2_000, None, Some("SIGKILL"), 10_000),
    ];
    let flags = analyze_crash_pattern(&ring, 3_000);
    assert!(flags.iter().any(|f| f.contains("external kill")));
}

#[test]
fn matching_exit_code_137_flags_oom() {
    let ring = vec![
        death(0, Some(137), None, 10_000),
        death(1_000, Some(137), None, 10_000),
        death(2_000, Some(137), None, 10_000),
    ];
    let flags = analyze_crash_pattern(&ring, 3_000);
    assert!(flags.iter().any(|f| f.contains("OOM")));
}

#[test]
fn two_fast_crashes_flags_startup_error() {
    let ring = vec![
        death(0, Some(1), None, 1_000),
        death(1_000, Some(2), None, 1_500),
        death(2_000, Some(3), None, 10_000),
    ];
    let flags = analyze_crash_pattern(&ring, 3_000);
    assert!(flags.iter().any(|f| f.contains("startup/config")));
}

#[test]
fn deaths_outside_the_window_are_ignored() {
    let ring = vec![
        death(0, Some(1), None, 10_000),
        death(1_000, Some(1), None, 10_000),
        death(2_000, Some(1), None, 10_000),
    ];
    assert!(analyze_crash_pattern(&ring, CRASH_PATTERN_WINDOW_MS + 10_000).is_empty());
}
