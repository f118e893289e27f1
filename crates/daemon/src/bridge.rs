// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the runner's callback surface to the supervisor, a per-agent fleet
//! snapshot the supervisor reads from, and any open `run` IPC streams.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tc_adapters::pipeline::OutputFrame;
use tc_core::{AgentId, NormalizedEvent, TokenUsage};
use tc_runner::{Runner, RunnerCallbacks};
use tc_supervisor::{AgentSnapshot, AgentSnapshotProvider, Supervisor, SupervisorCallbacks};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::protocol::Response;

/// The slice of per-agent state the runner doesn't track itself (class,
/// display name, current task, token usage, context window usage) kept up
/// to date purely by observing events as they pass through.
#[derive(Debug, Clone, Default)]
struct FleetEntry {
    agent_name: String,
    class: String,
    current_task: Option<String>,
    tokens: Option<TokenUsage>,
    context_used_percent: Option<f64>,
}

/// Live per-agent state, read by the supervisor through
/// [`AgentSnapshotProvider`] and by the `status` IPC query.
#[derive(Default)]
pub struct FleetState {
    entries: Mutex<HashMap<AgentId, FleetEntry>>,
    runner: OnceLock<Runner>,
}

impl FleetState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The runner is constructed after the callbacks that reference this
    /// fleet state, so it's bound in once the cycle is closed.
    pub fn bind_runner(&self, runner: Runner) {
        let _ = self.runner.set(runner);
    }

    fn runner(&self) -> Option<&Runner> {
        self.runner.get()
    }

    fn record_request(&self, req: &tc_core::Request) {
        let mut entries = self.entries.lock();
        let entry = entries.entry(req.agent_id.clone()).or_default();
        entry.agent_name = req.custom_agent.clone().unwrap_or_else(|| req.agent_id.as_str().to_string());
        entry.class = req.model.clone().unwrap_or_else(|| "default".to_string());
        entry.current_task = Some(req.prompt.clone());
    }

    fn record_event(&self, agent_id: &AgentId, event: &NormalizedEvent) {
        let mut entries = self.entries.lock();
        let entry = entries.entry(agent_id.clone()).or_default();
        match event {
            NormalizedEvent::ToolStart { tool_name, .. } => {
                entry.current_task = Some(format!("using {tool_name}"));
            }
            NormalizedEvent::StepComplete { tokens, result_text, .. } => {
                if tokens.is_some() {
                    entry.tokens = tokens.clone();
                }
                if let Some(text) = result_text {
                    entry.current_task = Some(text.clone());
                }
            }
            NormalizedEvent::ContextStats { context_stats_raw } => {
                entry.context_used_percent =
                    context_stats_raw.get("usedPercent").or_else(|| context_stats_raw.get("used_percent")).and_then(|v| v.as_f64());
            }
            _ => {}
        }
    }

    fn forget(&self, agent_id: &AgentId) {
        self.entries.lock().remove(agent_id);
    }
}

impl AgentSnapshotProvider for FleetState {
    fn agent_ids(&self) -> Vec<AgentId> {
        self.runner().map(|r| r.get_active_processes_state().into_iter().map(|p| p.agent_id).collect()).unwrap_or_default()
    }

    fn snapshot(&self, agent_id: &AgentId, now_ms: u64) -> Option<AgentSnapshot> {
        let active = self.runner()?.get_active_processes_state().into_iter().find(|p| &p.agent_id == agent_id)?;
        let entries = self.entries.lock();
        let extra = entries.get(agent_id).cloned().unwrap_or_default();
        Some(AgentSnapshot {
            agent_name: if extra.agent_name.is_empty() { agent_id.as_str().to_string() } else { extra.agent_name },
            class: if extra.class.is_empty() { "default".to_string() } else { extra.class },
            status: "running".to_string(),
            current_task: extra.current_task,
            tokens: extra.tokens,
            context_used_percent: extra.context_used_percent,
            time_since_activity_ms: now_ms.saturating_sub(active.last_activity_time_ms),
        })
    }
}

/// One open `run` IPC connection waiting for events for a given agent.
pub type RunStream = UnboundedSender<Response>;

/// Bridges the runner's callback surface to: the supervisor's narrative
/// extractor, the fleet snapshot, a durable log trail (spec §11), and any
/// IPC connections currently streaming a `run` request.
pub struct DaemonCallbacks {
    fleet: Arc<FleetState>,
    supervisor: OnceLock<Supervisor>,
    streams: Mutex<HashMap<AgentId, Vec<RunStream>>>,
}

impl DaemonCallbacks {
    pub fn new(fleet: Arc<FleetState>) -> Arc<Self> {
        Arc::new(Self { fleet, supervisor: OnceLock::new(), streams: Mutex::new(HashMap::new()) })
    }

    pub fn bind_supervisor(&self, supervisor: Supervisor) {
        let _ = self.supervisor.set(supervisor);
    }

    pub fn on_run_request(&self, req: &tc_core::Request) {
        self.fleet.record_request(req);
    }

    /// Register a stream that receives `Event`/`Output`/`Complete` frames
    /// for `agent_id` until the agent completes.
    pub fn subscribe(&self, agent_id: AgentId, sender: RunStream) {
        self.streams.lock().entry(agent_id).or_default().push(sender);
    }

    fn broadcast(&self, agent_id: &AgentId, response: Response) {
        let mut streams = self.streams.lock();
        if let Some(senders) = streams.get_mut(agent_id) {
            senders.retain(|tx| tx.send(response.clone()).is_ok());
        }
    }
}

impl RunnerCallbacks for DaemonCallbacks {
    fn on_event(&self, agent_id: &AgentId, event: &NormalizedEvent) {
        self.fleet.record_event(agent_id, event);
        if let Some(supervisor) = self.supervisor.get() {
            supervisor.record_event(agent_id, event);
        }
        self.broadcast(agent_id, Response::Event { agent_id: agent_id.clone(), event: event.clone() });
    }

    fn on_output(&self, agent_id: &AgentId, frame: &OutputFrame) {
        let line = match frame {
            OutputFrame::Banner(line) => line.clone(),
            OutputFrame::Text { text, .. } => text.clone(),
            OutputFrame::ToolStart(s) | OutputFrame::ToolInput(s) | OutputFrame::ToolResult(s) => s.clone(),
            OutputFrame::Tokens(s) | OutputFrame::Cost(s) => s.clone(),
            OutputFrame::ContextStats(v) => v.to_string(),
            OutputFrame::Error(s) => s.clone(),
            OutputFrame::Raw(line) => format!("[raw] {line}"),
        };
        self.broadcast(agent_id, Response::Output { agent_id: agent_id.clone(), line });
    }

    fn on_session_id(&self, agent_id: &AgentId, session_id: &str) {
        info!(%agent_id, session_id, "session id assigned");
    }

    fn on_complete(&self, agent_id: &AgentId, success: bool) {
        self.fleet.forget(agent_id);
        let mut streams = self.streams.lock();
        if let Some(senders) = streams.remove(agent_id) {
            for tx in senders {
                let _ = tx.send(Response::Complete { agent_id: agent_id.clone(), success });
            }
        }
    }

    fn on_error(&self, agent_id: &AgentId, message: &str) {
        warn!(%agent_id, message, "agent error");
        self.broadcast(agent_id, Response::Error { message: message.to_string() });
    }
}

/// Reports to the daemon log when no IPC observer is connected (spec §11
/// structured death/report log lines).
pub struct LoggingSupervisorCallbacks;

impl SupervisorCallbacks for LoggingSupervisorCallbacks {
    fn on_narrative(&self, narrative: &tc_core::ActivityNarrative) {
        tracing::debug!(agent_id = %narrative.agent_id, narrative = %narrative.narrative, "activity narrative");
    }

    fn on_report(&self, report: &tc_core::SupervisorReport) {
        info!(
            report_id = %report.id,
            overall_status = ?report.overall_status,
            agents = report.agent_summaries.len(),
            "supervisor report generated",
        );
    }
}
