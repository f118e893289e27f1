// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor Engine (C12): debounced, event-driven report generation over
//! a fleet of agents tracked elsewhere (the runner lives in a sibling
//! crate; this crate only sees the narrow snapshot shape it's fed through
//! [`AgentSnapshotProvider`], keeping the dependency one-way).

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tc_adapters::AgentBackend;
use tc_core::supervisor::SupervisorHistoryEntry;
use tc_core::{
    ActivityNarrative, AgentAnalysis, AgentId, AgentProgress, IdGen, NarrativeKind, NormalizedEvent, OverallStatus,
    SupervisorHistory, SupervisorReport, TokenUsage, UuidIdGen,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::clock::now_ms;
use crate::narrative;
use crate::{SupervisorError, ANALYSIS_TIMEOUT_MS, DEBOUNCE_MS, NARRATIVE_CAP};

/// A point-in-time view of one live agent, supplied by whatever owns the
/// actual process table (the daemon, bridging the runner's state).
#[derive(Debug, Clone)]
pub struct AgentSnapshot {
    pub agent_name: String,
    pub class: String,
    pub status: String,
    pub current_task: Option<String>,
    pub tokens: Option<TokenUsage>,
    pub context_used_percent: Option<f64>,
    pub time_since_activity_ms: u64,
}

/// Bridges the supervisor to the live agent fleet without creating a
/// dependency on the runner crate.
pub trait AgentSnapshotProvider: Send + Sync {
    fn agent_ids(&self) -> Vec<AgentId>;
    fn snapshot(&self, agent_id: &AgentId, now_ms: u64) -> Option<AgentSnapshot>;
}

/// Best-effort loader for an agent's persisted session, used only when an
/// agent has no in-memory narratives yet (spec §4.12 step 1).
pub trait SessionLoader: Send + Sync {
    fn load_recent_messages(&self, agent_id: &AgentId, limit: usize) -> Result<Vec<String>, String>;
}

/// Outbound surface of the supervisor: narrative lines and finished reports.
pub trait SupervisorCallbacks: Send + Sync {
    fn on_narrative(&self, narrative: &ActivityNarrative);
    fn on_report(&self, report: &SupervisorReport);
}

#[derive(Debug, Clone)]
struct AgentStatusSummary {
    agent_id: AgentId,
    agent_name: String,
    class: String,
    status: String,
    current_task: Option<String>,
    tokens: Option<TokenUsage>,
    context_used_percent: Option<f64>,
    time_since_activity_ms: u64,
    narratives: Vec<ActivityNarrative>,
}

pub const DEFAULT_ANALYSIS_TEMPLATE: &str = r#"You are supervising a fleet of autonomous coding agents. Given the agent data below, assess each agent's progress. Respond with ONLY a JSON object (no prose, no code fences) shaped exactly as:
{"agentAnalyses":[{"agentId":"...","agentName":"...","statusDescription":"...","progress":"on_track|stalled|blocked|completed|idle","recentWorkSummary":"...","concerns":["..."]}],"overallStatus":"healthy|attention_needed|critical","insights":["..."],"recommendations":["..."]}

Agent data:
{{AGENT_DATA}}"#;

struct Inner {
    backend: Arc<dyn AgentBackend>,
    provider: Arc<dyn AgentSnapshotProvider>,
    session_loader: Option<Arc<dyn SessionLoader>>,
    callbacks: Arc<dyn SupervisorCallbacks>,
    template: String,
    narratives: Mutex<HashMap<AgentId, Vec<ActivityNarrative>>>,
    debounce_token: Mutex<Option<CancellationToken>>,
    is_generating: AtomicBool,
    latest_report: Mutex<Option<SupervisorReport>>,
    history: Mutex<SupervisorHistory>,
    history_path: PathBuf,
}

/// A cheaply-cloneable handle onto the supervisor engine.
#[derive(Clone)]
pub struct Supervisor(Arc<Inner>);

impl Supervisor {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        provider: Arc<dyn AgentSnapshotProvider>,
        session_loader: Option<Arc<dyn SessionLoader>>,
        callbacks: Arc<dyn SupervisorCallbacks>,
        data_dir: impl Into<PathBuf>,
        template: Option<String>,
    ) -> Self {
        let data_dir = data_dir.into();
        let history_path = data_dir.join("supervisor-history.json");
        let history = tc_core::persist::load(&history_path).ok().flatten().unwrap_or_default();

        Self(Arc::new(Inner {
            backend,
            provider,
            session_loader,
            callbacks,
            template: template.unwrap_or_else(|| DEFAULT_ANALYSIS_TEMPLATE.to_string()),
            narratives: Mutex::new(HashMap::new()),
            debounce_token: Mutex::new(None),
            is_generating: AtomicBool::new(false),
            latest_report: Mutex::new(None),
            history: Mutex::new(history),
            history_path,
        }))
    }

    /// Feed a live event into the narrative extractor and, for `init` /
    /// `step_complete`, arm the debounce timer (spec §4.12).
    pub fn record_event(&self, agent_id: &AgentId, event: &NormalizedEvent) {
        if let Some(item) = narrative::extract(agent_id, event, now_ms()) {
            let mut store = self.0.narratives.lock();
            let list = store.entry(agent_id.clone()).or_default();
            tc_core::narrative::push_bounded(list, item.clone(), NARRATIVE_CAP);
            drop(store);
            self.0.callbacks.on_narrative(&item);
        }

        if matches!(event, NormalizedEvent::Init { .. } | NormalizedEvent::StepComplete { .. }) {
            self.trigger();
        }
    }

    /// Cancel any pending debounce timer and re-arm it for [`DEBOUNCE_MS`].
    pub fn trigger(&self) {
        let token = CancellationToken::new();
        let previous = self.0.debounce_token.lock().replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS)) => {
                    this.fire().await;
                }
            }
        });
    }

    async fn fire(&self) {
        if self.0.provider.agent_ids().is_empty() {
            return;
        }
        self.generate_report().await;
    }

    pub fn latest_report(&self) -> Option<SupervisorReport> {
        self.0.latest_report.lock().clone()
    }

    pub fn history_for(&self, agent_id: &AgentId) -> Vec<SupervisorHistoryEntry> {
        self.0.history.lock().histories.get(agent_id.as_str()).cloned().unwrap_or_default()
    }

    /// Run a full report cycle now. Concurrent callers while a cycle is
    /// already in flight get the cached latest report, or an interim
    /// placeholder if none exists yet (spec §4.12 concurrency guard).
    pub async fn generate_report(&self) -> SupervisorReport {
        if self
            .0
            .is_generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return self.latest_report().unwrap_or_else(|| self.placeholder_report());
        }
        let _guard = GeneratingGuard(&self.0.is_generating);

        let summaries = self.collect_summaries().await;
        let report = match self.run_analysis(&summaries).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "supervisor analysis failed, emitting fallback report");
                self.fallback_report(&summaries)
            }
        };

        for analysis in &report.agent_summaries {
            self.persist_history(&report.id, report.timestamp_ms, analysis);
        }

        *self.0.latest_report.lock() = Some(report.clone());
        self.0.callbacks.on_report(&report);
        report
    }

    fn placeholder_report(&self) -> SupervisorReport {
        SupervisorReport {
            id: UuidIdGen.next(),
            timestamp_ms: now_ms(),
            agent_summaries: Vec::new(),
            overall_status: OverallStatus::Healthy,
            insights: vec!["Report generation in progress.".to_string()],
            recommendations: Vec::new(),
            raw_response: None,
        }
    }

    async fn collect_summaries(&self) -> Vec<AgentStatusSummary> {
        let now = now_ms();
        let mut summaries = Vec::new();

        for agent_id in self.0.provider.agent_ids() {
            let Some(snapshot) = self.0.provider.snapshot(&agent_id, now) else {
                continue;
            };

            let mut narratives = {
                let store = self.0.narratives.lock();
                store
                    .get(&agent_id)
                    .map(|list| {
                        let start = list.len().saturating_sub(10);
                        list[start..].to_vec()
                    })
                    .unwrap_or_default()
            };

            if narratives.is_empty() {
                if let Some(loader) = &self.0.session_loader {
                    match loader.load_recent_messages(&agent_id, 20) {
                        Ok(messages) => {
                            narratives = messages
                                .into_iter()
                                .rev()
                                .take(10)
                                .map(|text| ActivityNarrative {
                                    id: UuidIdGen.next(),
                                    agent_id: agent_id.clone(),
                                    timestamp_ms: now,
                                    kind: NarrativeKind::Output,
                                    narrative: text,
                                    tool_name: None,
                                })
                                .collect();
                        }
                        Err(e) => {
                            warn!(agent = %agent_id, error = %e, "failed to load session history for supervisor summary");
                        }
                    }
                }
            }

            summaries.push(AgentStatusSummary {
                agent_id,
                agent_name: snapshot.agent_name,
                class: snapshot.class,
                status: snapshot.status,
                current_task: snapshot.current_task,
                tokens: snapshot.tokens,
                context_used_percent: snapshot.context_used_percent,
                time_since_activity_ms: snapshot.time_since_activity_ms,
                narratives,
            });
        }

        summaries
    }

    fn build_prompt(&self, summaries: &[AgentStatusSummary]) -> String {
        let agent_data: Vec<Value> = summaries
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.agent_id.as_str(),
                    "name": s.agent_name,
                    "class": s.class,
                    "status": s.status,
                    "currentTask": s.current_task,
                    "tokens": s.tokens,
                    "contextUsedPercent": s.context_used_percent,
                    "timeSinceLastActivityMs": s.time_since_activity_ms,
                    "recentNarratives": s.narratives.iter().map(|n| &n.narrative).collect::<Vec<_>>(),
                })
            })
            .collect();

        let agent_data_json = serde_json::to_string_pretty(&agent_data).unwrap_or_default();
        self.0.template.replace("{{AGENT_DATA}}", &agent_data_json)
    }

    async fn run_analysis(&self, summaries: &[AgentStatusSummary]) -> Result<SupervisorReport, SupervisorError> {
        if summaries.is_empty() {
            return Err(SupervisorError::Analysis("no agents to analyze".to_string()));
        }

        let prompt = self.build_prompt(summaries);
        let raw_response = self.run_one_shot(&prompt).await?;
        let (analyses, overall_status, insights, recommendations) = parse_analysis_response(&raw_response, summaries)?;

        Ok(SupervisorReport {
            id: UuidIdGen.next(),
            timestamp_ms: now_ms(),
            agent_summaries: analyses,
            overall_status,
            insights,
            recommendations,
            raw_response: Some(raw_response),
        })
    }

    async fn run_one_shot(&self, prompt: &str) -> Result<String, SupervisorError> {
        let backend = self.0.backend.clone();
        let executable = backend.executable_path().map_err(|e| SupervisorError::Analysis(e.to_string()))?;

        let mut command = Command::new(&executable);
        command
            .args(backend.build_analysis_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| SupervisorError::Analysis(e.to_string()))?;
        let pid = child.id();

        if let Some(mut stdin) = child.stdin.take() {
            let mut frame = backend.format_stdin_input(prompt);
            frame.push('\n');
            if let Err(e) = stdin.write_all(frame.as_bytes()).await {
                warn!(error = %e, "failed writing analysis prompt to stdin");
            }
            drop(stdin);
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SupervisorError::Analysis("analysis subprocess has no stdout".to_string()))?;

        let accumulate = async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut text = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Ok(raw) = serde_json::from_str::<Value>(trimmed) {
                    if let Some(NormalizedEvent::Text { text: chunk, .. }) = backend.parse_event(&raw) {
                        text.push_str(&chunk);
                    }
                }
            }
            (text, child.wait().await)
        };

        match tokio::time::timeout(Duration::from_millis(ANALYSIS_TIMEOUT_MS), accumulate).await {
            Ok((text, wait_result)) => {
                let status = wait_result.map_err(|e| SupervisorError::Analysis(e.to_string()))?;
                if !status.success() && text.is_empty() {
                    return Err(SupervisorError::Analysis(format!("analysis process exited with {status}")));
                }
                Ok(text)
            }
            Err(_) => {
                if let Some(pid) = pid {
                    kill_pid(pid);
                }
                Err(SupervisorError::Timeout(ANALYSIS_TIMEOUT_MS))
            }
        }
    }

    fn fallback_report(&self, summaries: &[AgentStatusSummary]) -> SupervisorReport {
        let agent_summaries = summaries
            .iter()
            .map(|s| AgentAnalysis {
                agent_id: s.agent_id.clone(),
                agent_name: s.agent_name.clone(),
                status_description: format!("{} ({})", s.status, s.class),
                progress: fallback_progress(&s.status),
                recent_work_summary: s
                    .narratives
                    .last()
                    .map(|n| n.narrative.clone())
                    .unwrap_or_else(|| "No recent activity recorded.".to_string()),
                concerns: Vec::new(),
            })
            .collect();

        SupervisorReport {
            id: UuidIdGen.next(),
            timestamp_ms: now_ms(),
            agent_summaries,
            overall_status: OverallStatus::Healthy,
            insights: vec!["Analysis unavailable; this report was derived from raw agent status only.".to_string()],
            recommendations: Vec::new(),
            raw_response: None,
        }
    }

    fn persist_history(&self, report_id: &str, report_timestamp_ms: u64, analysis: &AgentAnalysis) {
        let entry = SupervisorHistoryEntry {
            id: UuidIdGen.next(),
            timestamp_ms: report_timestamp_ms,
            report_id: report_id.to_string(),
            analysis: analysis.clone(),
        };

        let mut history = self.0.history.lock();
        history.record(&analysis.agent_id, entry);
        history.saved_at_ms = now_ms();
        if let Err(e) = tc_core::persist::save(&self.0.history_path, &*history) {
            warn!(error = %e, "failed to persist supervisor history");
        }
    }
}

struct GeneratingGuard<'a>(&'a AtomicBool);

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn fallback_progress(status: &str) -> AgentProgress {
    match status.to_ascii_lowercase().as_str() {
        "idle" => AgentProgress::Idle,
        "completed" | "done" => AgentProgress::Completed,
        "blocked" => AgentProgress::Blocked,
        "stalled" => AgentProgress::Stalled,
        _ => AgentProgress::OnTrack,
    }
}

fn parse_analysis_response(
    raw: &str,
    summaries: &[AgentStatusSummary],
) -> Result<(Vec<AgentAnalysis>, OverallStatus, Vec<String>, Vec<String>), SupervisorError> {
    let cleaned = strip_code_fences(raw);
    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| SupervisorError::InvalidResponse(format!("invalid JSON: {e}")))?;

    let analyses_raw = value
        .get("agentAnalyses")
        .and_then(Value::as_array)
        .ok_or_else(|| SupervisorError::InvalidResponse("missing agentAnalyses array".to_string()))?;

    let mut analyses = Vec::with_capacity(analyses_raw.len());
    for item in analyses_raw {
        let agent_name = item.get("agentName").and_then(Value::as_str).unwrap_or_default().to_string();
        let agent_id = item
            .get("agentId")
            .and_then(Value::as_str)
            .map(AgentId::new)
            .or_else(|| summaries.iter().find(|s| s.agent_name == agent_name).map(|s| s.agent_id.clone()))
            .unwrap_or_else(|| AgentId::new(agent_name.clone()));

        analyses.push(AgentAnalysis {
            agent_id,
            agent_name,
            status_description: item.get("statusDescription").and_then(Value::as_str).unwrap_or_default().to_string(),
            progress: parse_progress(item.get("progress").and_then(Value::as_str)),
            recent_work_summary: item.get("recentWorkSummary").and_then(Value::as_str).unwrap_or_default().to_string(),
            concerns: string_array(item, "concerns"),
        });
    }

    let overall_status = match value.get("overallStatus").and_then(Value::as_str) {
        Some("critical") => OverallStatus::Critical,
        Some("attention_needed") => OverallStatus::AttentionNeeded,
        _ => OverallStatus::Healthy,
    };

    Ok((analyses, overall_status, string_array(&value, "insights"), string_array(&value, "recommendations")))
}

fn parse_progress(raw: Option<&str>) -> AgentProgress {
    match raw {
        Some("stalled") => AgentProgress::Stalled,
        Some("blocked") => AgentProgress::Blocked,
        Some("completed") => AgentProgress::Completed,
        Some("idle") => AgentProgress::Idle,
        _ => AgentProgress::OnTrack,
    }
}

fn string_array(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")).unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(unix)]
fn kill_pid(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(not(unix))]
fn kill_pid(_pid: u32) {}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
