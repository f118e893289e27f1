// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};

use tc_adapters::backend::BackendError;
use tempfile::tempdir;

use super::*;

/// Shells out to `/bin/sh` instead of a real CLI; the script's stdout is
/// hand-crafted `NormalizedEvent`-shaped JSON so `parse_event` delegates to
/// a plain `serde_json` round trip, same trick used by the runner's tests.
struct FakeBackend {
    script: String,
}

impl FakeBackend {
    fn emitting(response_json: &str) -> Self {
        let line = serde_json::json!({ "type": "text", "text": response_json, "is_streaming": false }).to_string();
        Self { script: format!("printf '%s\\n' {}", shell_single_quote(&line)) }
    }

    fn slow(response_json: &str, sleep_secs: u64) -> Self {
        let line = serde_json::json!({ "type": "text", "text": response_json, "is_streaming": false }).to_string();
        Self { script: format!("sleep {sleep_secs} && printf '%s\\n' {}", shell_single_quote(&line)) }
    }
}

fn shell_single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

impl AgentBackend for FakeBackend {
    fn build_args(&self, _req: &tc_core::Request) -> Vec<String> {
        Vec::new()
    }
    fn format_stdin_input(&self, prompt: &str) -> String {
        prompt.to_string()
    }
    fn parse_event(&self, raw: &Value) -> Option<NormalizedEvent> {
        serde_json::from_value(raw.clone()).ok()
    }
    fn extract_session_id(&self, _raw: &Value) -> Option<String> {
        None
    }
    fn executable_path(&self) -> Result<String, BackendError> {
        Ok("/bin/sh".to_string())
    }
    fn requires_stdin_input(&self) -> bool {
        true
    }
    fn build_analysis_args(&self) -> Vec<String> {
        vec!["-c".to_string(), self.script.clone()]
    }
}

struct FakeProvider {
    agents: Vec<(AgentId, AgentSnapshot)>,
}

impl AgentSnapshotProvider for FakeProvider {
    fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|(id, _)| id.clone()).collect()
    }
    fn snapshot(&self, agent_id: &AgentId, _now_ms: u64) -> Option<AgentSnapshot> {
        self.agents.iter().find(|(id, _)| id == agent_id).map(|(_, s)| s.clone())
    }
}

fn one_agent_provider() -> Arc<dyn AgentSnapshotProvider> {
    Arc::new(FakeProvider {
        agents: vec![(
            AgentId::new("agent-1"),
            AgentSnapshot {
                agent_name: "Agent One".to_string(),
                class: "coder".to_string(),
                status: "running".to_string(),
                current_task: Some("writing tests".to_string()),
                tokens: Some(TokenUsage { input: 100, output: 50, cache_creation: None, cache_read: None }),
                context_used_percent: Some(12.5),
                time_since_activity_ms: 500,
            },
        )],
    })
}

#[derive(Default)]
struct Capture {
    narratives: Mutex<Vec<ActivityNarrative>>,
    reports: Mutex<Vec<SupervisorReport>>,
    report_count: AtomicUsize,
}

impl SupervisorCallbacks for Capture {
    fn on_narrative(&self, narrative: &ActivityNarrative) {
        self.narratives.lock().push(narrative.clone());
    }
    fn on_report(&self, report: &SupervisorReport) {
        self.reports.lock().push(report.clone());
        self.report_count.fetch_add(1, Ordering::SeqCst);
    }
}

fn sample_response() -> String {
    serde_json::json!({
        "agentAnalyses": [{
            "agentId": "agent-1",
            "agentName": "Agent One",
            "statusDescription": "actively coding",
            "progress": "on_track",
            "recentWorkSummary": "writing unit tests",
            "concerns": [],
        }],
        "overallStatus": "healthy",
        "insights": ["all agents nominal"],
        "recommendations": [],
    })
    .to_string()
}

#[tokio::test]
async fn generate_report_parses_the_one_shot_response() {
    let dir = tempdir().expect("tempdir");
    let backend: Arc<dyn AgentBackend> = Arc::new(FakeBackend::emitting(&sample_response()));
    let callbacks = Arc::new(Capture::default());
    let supervisor =
        Supervisor::new(backend, one_agent_provider(), None, callbacks.clone(), dir.path(), None);

    let report = supervisor.generate_report().await;

    assert_eq!(report.agent_summaries.len(), 1);
    assert_eq!(report.agent_summaries[0].agent_id, AgentId::new("agent-1"));
    assert_eq!(report.agent_summaries[0].status_description, "actively coding");
    assert_eq!(report.overall_status, OverallStatus::Healthy);
    assert_eq!(callbacks.report_count.load(Ordering::SeqCst), 1);
    assert_eq!(supervisor.history_for(&AgentId::new("agent-1")).len(), 1);
}

#[tokio::test]
async fn malformed_response_falls_back_to_status_derived_report() {
    let dir = tempdir().expect("tempdir");
    let backend: Arc<dyn AgentBackend> = Arc::new(FakeBackend::emitting("not json at all"));
    let callbacks = Arc::new(Capture::default());
    let supervisor =
        Supervisor::new(backend, one_agent_provider(), None, callbacks.clone(), dir.path(), None);

    let report = supervisor.generate_report().await;

    assert_eq!(report.agent_summaries.len(), 1);
    assert!(report.raw_response.is_none());
    assert!(report.insights.iter().any(|i| i.contains("unavailable")));
}

#[tokio::test]
async fn concurrent_calls_return_the_placeholder_or_cache() {
    let dir = tempdir().expect("tempdir");
    let backend: Arc<dyn AgentBackend> = Arc::new(FakeBackend::slow(&sample_response(), 2));
    let callbacks = Arc::new(Capture::default());
    let supervisor =
        Supervisor::new(backend, one_agent_provider(), None, callbacks.clone(), dir.path(), None);

    let slow = supervisor.clone();
    let handle = tokio::spawn(async move { slow.generate_report().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    let interim = supervisor.generate_report().await;
    assert!(interim.insights.iter().any(|i| i.contains("in progress")));

    let final_report = handle.await.expect("task");
    assert_eq!(final_report.agent_summaries.len(), 1);
}

/// Real-time debounce test: two triggers 200ms apart must collapse into a
/// single report fired `DEBOUNCE_MS` after the *second* one, not the first.
#[tokio::test]
async fn record_event_debounces_bursts_into_one_report() {
    let dir = tempdir().expect("tempdir");
    let backend: Arc<dyn AgentBackend> = Arc::new(FakeBackend::emitting(&sample_response()));
    let callbacks = Arc::new(Capture::default());
    let supervisor =
        Supervisor::new(backend, one_agent_provider(), None, callbacks.clone(), dir.path(), None);

    let init_event = NormalizedEvent::Init { session_id: "s1".to_string(), model: "m".to_string(), tools: vec![] };
    supervisor.record_event(&AgentId::new("agent-1"), &init_event);
    tokio::time::sleep(Duration::from_millis(200)).await;
    supervisor.record_event(&AgentId::new("agent-1"), &init_event);

    // Just past the first trigger's window: the reset must have suppressed it.
    tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS - 500)).await;
    assert_eq!(callbacks.report_count.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(callbacks.report_count.load(Ordering::SeqCst), 1);
}
