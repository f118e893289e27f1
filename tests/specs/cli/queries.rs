//! CLI query specs: status/deaths/report/history against a daemon with no
//! agents running.

use crate::prelude::*;

#[test]
fn status_reports_no_agents_when_none_running() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });

    project.tide().args(&["status"]).passes().stdout_has("no agents running");
}

#[test]
fn status_json_output_is_empty_array() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });

    let out = project.tide().args(&["-o", "json", "status"]).passes();
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&out.stdout()).expect("status --output json should be valid JSON");
    assert!(parsed.is_empty());
}

#[test]
fn deaths_reports_none_recorded() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });

    project.tide().args(&["deaths"]).passes().stdout_has("no deaths recorded");
}

#[test]
fn report_reports_none_available_yet() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });

    project.tide().args(&["report"]).passes().stdout_has("no report available yet");
}

#[test]
fn history_reports_no_history_for_unknown_agent() {
    let project = Project::empty();
    project.tide().args(&["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || {
        project.tide().args(&["daemon", "status"]).passes().stdout().contains("daemon running")
    });

    project.tide().args(&["history", "nonexistent-agent"]).passes().stdout_has("no history recorded");
}

#[test]
fn status_fails_with_clear_error_when_daemon_not_running() {
    let project = Project::empty();
    project.tide().args(&["status"]).fails().stderr_has("error: daemon not running");
}

#[test]
fn report_fails_with_clear_error_when_daemon_not_running() {
    let project = Project::empty();
    project.tide().args(&["report"]).fails().stderr_has("error: daemon not running");
}
