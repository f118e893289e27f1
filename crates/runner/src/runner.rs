// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner Façade (C10): the only public entry point into process lifecycle,
//! restart policy, the watchdog and the recovery store. Owns the active
//! process table and wires the internal bus to each subsystem.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tc_adapters::{AgentBackend, OutputFrame, StdoutPipeline};
use tc_core::{death, AgentId, DeathRecord, NormalizedEvent, RecoveryEntry, Request};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bus::{BusEvent, EventBus, Kind};
use crate::entry::ActiveEntry;
use crate::lifecycle;
use crate::recovery::RecoveryStore;
use crate::restart::{self, Decision, DecisionInput};
use crate::watchdog;
use crate::{RunnerError, RECOVERY_SNAPSHOT_INTERVAL_MS, WATCHDOG_INTERVAL_MS};

/// The runner's sole outbound surface (spec §4.10). No method returns a
/// value the runner depends on; these are pure notifications.
pub trait RunnerCallbacks: Send + Sync {
    fn on_event(&self, agent_id: &AgentId, event: &NormalizedEvent);
    fn on_output(&self, agent_id: &AgentId, frame: &OutputFrame);
    fn on_session_id(&self, agent_id: &AgentId, session_id: &str);
    fn on_complete(&self, agent_id: &AgentId, success: bool);
    fn on_error(&self, agent_id: &AgentId, message: &str);
}

/// A snapshot of one active process for diagnostics and status surfaces.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ActiveProcessInfo {
    pub agent_id: AgentId,
    pub pid: u32,
    pub session_id: Option<String>,
    pub start_time_ms: u64,
    pub last_activity_time_ms: u64,
    pub restart_count: u32,
}

type ActivityCallback = Box<dyn FnOnce(u64) + Send>;

#[derive(Default)]
struct State {
    entries: HashMap<AgentId, ActiveEntry>,
    pipelines: HashMap<AgentId, StdoutPipeline>,
    stderr_tails: HashMap<AgentId, String>,
    deaths: Vec<DeathRecord>,
    next_activity: HashMap<AgentId, Vec<ActivityCallback>>,
}

struct Inner {
    state: Mutex<State>,
    bus: EventBus,
    backend: Arc<dyn AgentBackend>,
    callbacks: Arc<dyn RunnerCallbacks>,
    recovery: RecoveryStore,
    auto_restart: AtomicBool,
    tide_server_url: String,
}

/// Cloneable façade; every clone shares the same active process table.
#[derive(Clone)]
pub struct Runner(Arc<Inner>);

impl Runner {
    /// Construct a runner, reattach to (or resume) whatever the last
    /// recovery snapshot recorded, and start the watchdog and recovery
    /// background loops.
    pub async fn new(
        backend: Arc<dyn AgentBackend>,
        callbacks: Arc<dyn RunnerCallbacks>,
        data_dir: impl Into<PathBuf>,
        tide_server_url: String,
    ) -> Self {
        let runner = Self(Arc::new(Inner {
            state: Mutex::new(State::default()),
            bus: EventBus::new(),
            backend,
            callbacks,
            recovery: RecoveryStore::new(data_dir),
            auto_restart: AtomicBool::new(true),
            tide_server_url,
        }));
        runner.wire_bus();
        runner.reconcile().await;
        runner.spawn_watchdog();
        runner.spawn_recovery_loop();
        runner
    }

    fn wire_bus(&self) {
        let r = self.clone();
        self.0.bus.on(Kind::Activity, move |ev| {
            if let BusEvent::Activity { agent_id, now_ms } = ev {
                r.on_activity(agent_id, *now_ms);
            }
        });

        let r = self.clone();
        self.0.bus.on(Kind::SessionId, move |ev| {
            if let BusEvent::SessionId { agent_id, session_id } = ev {
                r.on_session_id_event(agent_id, session_id);
            }
        });

        self.0.bus.on(Kind::ProcessSpawned, move |ev| {
            if let BusEvent::ProcessSpawned { agent_id, pid } = ev {
                info!(%agent_id, pid, "process spawned");
            }
        });

        let r = self.clone();
        self.0.bus.on(Kind::ProcessSpawnError, move |ev| {
            if let BusEvent::ProcessSpawnError { agent_id, message } = ev {
                warn!(%agent_id, message, "process spawn failed");
                r.0.callbacks.on_error(agent_id, message);
            }
        });

        let r = self.clone();
        self.0.bus.on(Kind::ProcessClosed, move |ev| {
            if let BusEvent::ProcessClosed { agent_id, exit_code, signal } = ev {
                r.on_process_closed(agent_id, *exit_code, signal.clone());
            }
        });

        let r = self.clone();
        self.0.bus.on(Kind::WatchdogMissingProcess, move |ev| {
            if let BusEvent::WatchdogMissingProcess { agent_id } = ev {
                r.on_watchdog_missing_process(agent_id);
            }
        });

        let r = self.clone();
        self.0.bus.on(Kind::Event, move |ev| {
            if let BusEvent::Event { agent_id, event } = ev {
                r.0.callbacks.on_event(agent_id, event);
            }
        });
    }

    /// Reload the last recovery snapshot: reattach entries whose pid is
    /// still alive, resume the rest from their saved session id.
    async fn reconcile(&self) {
        let snapshot = match self.0.recovery.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "failed to load recovery snapshot");
                return;
            }
        };

        for saved in snapshot.entries {
            if lifecycle::is_alive(saved.pid) {
                info!(agent_id = %saved.agent_id, pid = saved.pid, "reattaching to live process");
                let mut state = self.0.state.lock();
                state.pipelines.insert(saved.agent_id.clone(), StdoutPipeline::new());
                state.stderr_tails.insert(saved.agent_id.clone(), String::new());
                state.entries.insert(
                    saved.agent_id.clone(),
                    ActiveEntry {
                        agent_id: saved.agent_id,
                        session_id: saved.session_id,
                        last_request: saved.last_request,
                        pid: saved.pid,
                        start_time_ms: saved.start_time_ms,
                        last_activity_time_ms: crate::clock::now_ms(),
                        restart_count: 0,
                        last_restart_time_ms: None,
                        last_error: None,
                        stdin: None,
                        io_cancel: CancellationToken::new(),
                    },
                );
            } else {
                info!(agent_id = %saved.agent_id, pid = saved.pid, "recovery process gone, resuming from saved session");
                let mut request = saved.last_request;
                request.session_id = saved.session_id;
                if let Err(e) = self.run(request).await {
                    warn!(agent_id = %saved.agent_id, error = %e, "failed to resume agent on recovery");
                }
            }
        }
    }

    fn spawn_watchdog(&self) {
        let runner = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(WATCHDOG_INTERVAL_MS));
            loop {
                interval.tick().await;
                let missing: Vec<AgentId> = {
                    let state = runner.0.state.lock();
                    state
                        .entries
                        .iter()
                        .filter(|(_, e)| watchdog::pid_missing(e.pid))
                        .map(|(id, _)| id.clone())
                        .collect()
                };
                for agent_id in missing {
                    runner.0.bus.emit(BusEvent::WatchdogMissingProcess { agent_id });
                }
            }
        });
    }

    fn spawn_recovery_loop(&self) {
        let runner = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(RECOVERY_SNAPSHOT_INTERVAL_MS));
            loop {
                interval.tick().await;
                runner.snapshot_recovery();
            }
        });
    }

    fn snapshot_recovery(&self) {
        let entries = self.recovery_entries();
        if let Err(e) = self.0.recovery.save(entries) {
            warn!(error = %e, "failed to persist recovery snapshot");
        }
    }

    fn recovery_entries(&self) -> Vec<RecoveryEntry> {
        let state = self.0.state.lock();
        state
            .entries
            .values()
            .map(|e| RecoveryEntry {
                agent_id: e.agent_id.clone(),
                pid: e.pid,
                session_id: e.session_id.clone(),
                last_request: e.last_request.clone(),
                start_time_ms: e.start_time_ms,
            })
            .collect()
    }

    /// Run `req`: stop any existing process for the same agent, spawn a
    /// fresh one, record it, and write the initial prompt frame.
    pub async fn run(&self, req: Request) -> Result<(), RunnerError> {
        self.stop(&req.agent_id);

        let backend = self.0.backend.clone();
        let (mut child, mut stdin, pid) = match lifecycle::spawn_child(backend.as_ref(), &req, &self.0.tide_server_url) {
            Ok(v) => v,
            Err(e) => {
                self.0.bus.emit(BusEvent::ProcessSpawnError {
                    agent_id: req.agent_id.clone(),
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let now = crate::clock::now_ms();
        let io_cancel = CancellationToken::new();
        {
            let mut state = self.0.state.lock();
            state.entries.insert(
                req.agent_id.clone(),
                ActiveEntry {
                    agent_id: req.agent_id.clone(),
                    session_id: req.session_id.clone(),
                    last_request: req.clone(),
                    pid,
                    start_time_ms: now,
                    last_activity_time_ms: now,
                    restart_count: 0,
                    last_restart_time_ms: None,
                    last_error: None,
                    stdin: None,
                    io_cancel: io_cancel.clone(),
                },
            );
            state.pipelines.insert(req.agent_id.clone(), StdoutPipeline::new());
            state.stderr_tails.insert(req.agent_id.clone(), String::new());
        }

        self.0.bus.emit(BusEvent::ProcessSpawned { agent_id: req.agent_id.clone(), pid });

        let stdout_done = if let Some(stdout) = stdout {
            let runner = self.clone();
            let agent_id = req.agent_id.clone();
            let cancel = io_cancel.clone();
            tokio::spawn(async move { runner.read_stdout(agent_id, stdout, cancel).await })
        } else {
            tokio::spawn(async {})
        };

        if let Some(stderr) = stderr {
            let runner = self.clone();
            let agent_id = req.agent_id.clone();
            let cancel = io_cancel.clone();
            tokio::spawn(async move { runner.read_stderr(agent_id, stderr, cancel).await });
        }

        let runner = self.clone();
        let agent_id = req.agent_id.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            let _ = stdout_done.await;
            let (exit_code, signal) = decode_exit_status(status);
            runner.0.bus.emit(BusEvent::ProcessClosed { agent_id, exit_code, signal });
        });

        self.write_initial_prompt(&req.agent_id, &req.prompt, &mut stdin).await;

        {
            let mut state = self.0.state.lock();
            if let Some(entry) = state.entries.get_mut(&req.agent_id) {
                entry.stdin = Some(stdin);
            }
        }

        Ok(())
    }

    async fn write_initial_prompt(&self, agent_id: &AgentId, prompt: &str, stdin: &mut ChildStdin) {
        let mut frame = self.0.backend.format_stdin_input(prompt);
        frame.push('\n');
        if let Err(e) = stdin.write_all(frame.as_bytes()).await {
            warn!(%agent_id, error = %e, "initial stdin write failed");
            let mut state = self.0.state.lock();
            if let Some(entry) = state.entries.get_mut(agent_id) {
                entry.last_error = Some(e.to_string());
            }
        }
    }

    /// Stop the agent's process, if any: remove it from the table, fire
    /// `onComplete(false)` once, and drive the signal escalation ladder in
    /// the background. Idempotent — a second call is a no-op.
    pub fn stop(&self, agent_id: &AgentId) -> bool {
        let pid = {
            let mut state = self.0.state.lock();
            state.next_activity.remove(agent_id);
            state.pipelines.remove(agent_id);
            state.stderr_tails.remove(agent_id);
            let entry = state.entries.remove(agent_id);
            if let Some(entry) = &entry {
                entry.io_cancel.cancel();
            }
            entry.map(|e| e.pid)
        };

        match pid {
            Some(pid) => {
                self.0.callbacks.on_complete(agent_id, false);
                lifecycle::spawn_stop_escalation(pid);
                true
            }
            None => false,
        }
    }

    /// Stop every tracked agent. `kill_processes` true kills them and
    /// clears the recovery snapshot (used on explicit shutdown); false
    /// leaves the OS processes running and persists them for a later
    /// reattach (used across a daemon restart).
    pub fn stop_all(&self, kill_processes: bool) {
        self.0.auto_restart.store(false, Ordering::SeqCst);

        if kill_processes {
            let ids: Vec<AgentId> = {
                let state = self.0.state.lock();
                state.entries.keys().cloned().collect()
            };
            for id in ids {
                self.stop(&id);
            }
            if let Err(e) = self.0.recovery.clear() {
                warn!(error = %e, "failed to clear recovery snapshot");
            }
        } else {
            let entries = self.recovery_entries();
            if let Err(e) = self.0.recovery.save(entries) {
                warn!(error = %e, "failed to persist recovery snapshot before shutdown");
            }
            let mut state = self.0.state.lock();
            state.entries.clear();
            state.pipelines.clear();
            state.stderr_tails.clear();
            state.next_activity.clear();
        }
    }

    /// Send `SIGINT` to the agent's process group without removing it from
    /// the table. Returns false if the agent isn't running.
    pub fn interrupt(&self, agent_id: &AgentId) -> bool {
        let pid = {
            let state = self.0.state.lock();
            state.entries.get(agent_id).map(|e| e.pid)
        };
        match pid {
            Some(pid) => lifecycle::send_sigint(pid),
            None => false,
        }
    }

    /// Write a follow-up message to a running agent's stdin. False if the
    /// agent isn't running, has no stdin handle, or the write failed.
    pub async fn send_message(&self, agent_id: &AgentId, message: &str) -> bool {
        let frame = self.0.backend.format_stdin_input(message);
        match self.write_to_stdin(agent_id, frame).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%agent_id, error = %e, "sendMessage failed");
                false
            }
        }
    }

    async fn write_to_stdin(&self, agent_id: &AgentId, mut frame: String) -> Result<(), RunnerError> {
        let mut stdin = {
            let mut state = self.0.state.lock();
            let entry = state
                .entries
                .get_mut(agent_id)
                .ok_or_else(|| RunnerError::SpawnFailed("agent not running".to_string()))?;
            entry
                .stdin
                .take()
                .ok_or_else(|| RunnerError::SpawnFailed("agent has no writable stdin".to_string()))?
        };

        frame.push('\n');
        let result = stdin.write_all(frame.as_bytes()).await;

        let mut state = self.0.state.lock();
        if let Some(entry) = state.entries.get_mut(agent_id) {
            entry.stdin = Some(stdin);
        }
        drop(state);

        result.map_err(RunnerError::Io)
    }

    pub fn is_running(&self, agent_id: &AgentId) -> bool {
        self.0.state.lock().entries.contains_key(agent_id)
    }

    pub fn get_session_id(&self, agent_id: &AgentId) -> Option<String> {
        self.0.state.lock().entries.get(agent_id).and_then(|e| e.session_id.clone())
    }

    /// The rolling last ≤2048 bytes of stderr captured for a running agent.
    pub fn get_stderr_tail(&self, agent_id: &AgentId) -> Option<String> {
        self.0.state.lock().stderr_tails.get(agent_id).cloned()
    }

    pub fn has_recent_activity(&self, agent_id: &AgentId, within_ms: u64, now_ms: u64) -> bool {
        match self.0.state.lock().entries.get(agent_id) {
            Some(entry) => now_ms.saturating_sub(entry.last_activity_time_ms) <= within_ms,
            None => false,
        }
    }

    /// Register a one-shot callback invoked with the timestamp of the next
    /// activity event for this agent. Multiple callbacks queue in order.
    pub fn on_next_activity(&self, agent_id: &AgentId, callback: ActivityCallback) {
        self.0.state.lock().next_activity.entry(agent_id.clone()).or_default().push(callback);
    }

    pub fn clear_activity_callbacks(&self, agent_id: &AgentId) {
        self.0.state.lock().next_activity.remove(agent_id);
    }

    pub fn get_active_process_count(&self) -> usize {
        self.0.state.lock().entries.len()
    }

    pub fn get_death_history(&self) -> Vec<DeathRecord> {
        self.0.state.lock().deaths.clone()
    }

    pub fn get_active_processes_state(&self) -> Vec<ActiveProcessInfo> {
        self.0
            .state
            .lock()
            .entries
            .values()
            .map(|e| ActiveProcessInfo {
                agent_id: e.agent_id.clone(),
                pid: e.pid,
                session_id: e.session_id.clone(),
                start_time_ms: e.start_time_ms,
                last_activity_time_ms: e.last_activity_time_ms,
                restart_count: e.restart_count,
            })
            .collect()
    }

    pub fn log_process_diagnostics(&self, agent_id: &AgentId) {
        let state = self.0.state.lock();
        match state.entries.get(agent_id) {
            Some(entry) => {
                let tail = state.stderr_tails.get(agent_id).map(String::as_str).unwrap_or("");
                info!(
                    %agent_id,
                    pid = entry.pid,
                    restart_count = entry.restart_count,
                    last_error = ?entry.last_error,
                    stderr_tail = tail,
                    "process diagnostics",
                );
            }
            None => info!(%agent_id, "process diagnostics: agent not running"),
        }
    }

    pub fn set_auto_restart(&self, enabled: bool) {
        self.0.auto_restart.store(enabled, Ordering::SeqCst);
    }

    pub fn supports_stdin(&self, agent_id: &AgentId) -> bool {
        self.0.backend.requires_stdin_input()
            && self.0.state.lock().entries.get(agent_id).is_some_and(|e| e.stdin.is_some())
    }

    pub fn get_process_memory_mb(&self, agent_id: &AgentId) -> Option<f64> {
        let pid = self.0.state.lock().entries.get(agent_id)?.pid;
        tc_adapters::resource::process_memory_mb(pid)
    }

    pub fn get_all_process_memory(&self) -> HashMap<AgentId, f64> {
        let pids: Vec<(AgentId, u32)> = {
            let state = self.0.state.lock();
            state.entries.values().map(|e| (e.agent_id.clone(), e.pid)).collect()
        };
        pids.into_iter()
            .filter_map(|(id, pid)| tc_adapters::resource::process_memory_mb(pid).map(|mb| (id, mb)))
            .collect()
    }

    fn on_activity(&self, agent_id: &AgentId, now_ms: u64) {
        let callbacks = {
            let mut state = self.0.state.lock();
            if let Some(entry) = state.entries.get_mut(agent_id) {
                entry.last_activity_time_ms = now_ms;
            }
            state.next_activity.remove(agent_id).unwrap_or_default()
        };
        for callback in callbacks {
            callback(now_ms);
        }
    }

    fn on_session_id_event(&self, agent_id: &AgentId, session_id: &str) {
        {
            let mut state = self.0.state.lock();
            if let Some(entry) = state.entries.get_mut(agent_id) {
                entry.session_id = Some(session_id.to_string());
                entry.last_request.session_id = Some(session_id.to_string());
            }
        }
        self.0.callbacks.on_session_id(agent_id, session_id);
    }

    fn on_process_closed(&self, agent_id: &AgentId, exit_code: Option<i32>, signal: Option<String>) {
        let (entry, stderr_tail) = {
            let mut state = self.0.state.lock();
            let entry = state.entries.remove(agent_id);
            let tail = state.stderr_tails.remove(agent_id);
            state.pipelines.remove(agent_id);
            (entry, tail)
        };

        let Some(entry) = entry else {
            // Already removed by an explicit stop(); onComplete(false) already fired.
            return;
        };

        let now = crate::clock::now_ms();
        let runtime_ms = now.saturating_sub(entry.start_time_ms);
        let clean = exit_code == Some(0);
        let explicit_signal = matches!(signal.as_deref(), Some("SIGINT") | Some("SIGTERM"));

        if !clean && !explicit_signal {
            self.record_death(DeathRecord {
                agent_id: agent_id.clone(),
                pid: entry.pid,
                exit_code,
                signal: signal.clone(),
                runtime_ms,
                was_tracked: true,
                timestamp_ms: now,
                stderr_tail,
            });
        }

        self.0.callbacks.on_complete(agent_id, clean);

        if !clean {
            self.maybe_auto_restart(entry, exit_code, signal);
        }
    }

    fn on_watchdog_missing_process(&self, agent_id: &AgentId) {
        let (entry, stderr_tail) = {
            let mut state = self.0.state.lock();
            let entry = state.entries.remove(agent_id);
            let tail = state.stderr_tails.remove(agent_id);
            state.pipelines.remove(agent_id);
            (entry, tail)
        };

        let Some(entry) = entry else { return };

        let now = crate::clock::now_ms();
        self.record_death(DeathRecord {
            agent_id: agent_id.clone(),
            pid: entry.pid,
            exit_code: None,
            signal: None,
            runtime_ms: now.saturating_sub(entry.start_time_ms),
            was_tracked: true,
            timestamp_ms: now,
            stderr_tail,
        });

        self.0.callbacks.on_complete(agent_id, false);
        self.maybe_auto_restart(entry, None, None);
    }

    fn record_death(&self, record: DeathRecord) {
        let flags = {
            let mut state = self.0.state.lock();
            death::push_bounded(&mut state.deaths, record.clone());
            watchdog::analyze_crash_pattern(&state.deaths, record.timestamp_ms)
        };
        warn!(
            agent_id = %record.agent_id,
            pid = record.pid,
            exit_code = ?record.exit_code,
            signal = ?record.signal,
            "agent process died",
        );
        for flag in flags {
            warn!(agent_id = %record.agent_id, flag, "crash pattern detected");
        }
    }

    fn maybe_auto_restart(&self, entry: ActiveEntry, exit_code: Option<i32>, signal: Option<String>) {
        let now = crate::clock::now_ms();
        let input = DecisionInput {
            auto_restart_enabled: self.0.auto_restart.load(Ordering::SeqCst),
            has_last_request: true,
            runtime_ms: now.saturating_sub(entry.start_time_ms),
            exit_code,
            signal,
            restart_count: entry.restart_count,
            last_restart_time_ms: entry.last_restart_time_ms,
            now_ms: now,
        };

        match restart::decide(&input) {
            Decision::NoOp => {}
            Decision::Terminal(message) => {
                self.0.callbacks.on_error(&entry.agent_id, &message);
            }
            Decision::Restart { delay_ms, next_restart_count } => {
                let runner = self.clone();
                let agent_id = entry.agent_id.clone();
                let request = entry.last_request.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    match runner.run(request).await {
                        Ok(()) => {
                            let restart_time = crate::clock::now_ms();
                            let mut state = runner.0.state.lock();
                            if let Some(fresh) = state.entries.get_mut(&agent_id) {
                                fresh.restart_count = next_restart_count;
                                fresh.last_restart_time_ms = Some(restart_time);
                            }
                            drop(state);
                            runner
                                .0
                                .callbacks
                                .on_output(&agent_id, &OutputFrame::Banner("[System] Process was automatically restarted after crash".to_string()));
                        }
                        Err(e) => {
                            runner.0.callbacks.on_error(&agent_id, &format!("restart failed: {e}"));
                        }
                    }
                });
            }
        }
    }

    async fn read_stdout(&self, agent_id: AgentId, stdout: ChildStdout, cancel: CancellationToken) {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        self.handle_stdout_line(&agent_id, trimmed);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(%agent_id, error = %e, "stdout read error");
                    break;
                }
            }
        }
    }

    fn handle_stdout_line(&self, agent_id: &AgentId, line: &str) {
        let backend = self.0.backend.clone();
        let outcome = {
            let mut state = self.0.state.lock();
            // The agent may have been stopped (and possibly re-run under the
            // same id) while this line was in flight from the old child's
            // stdout. Once `stop()` has removed the entry, the pipeline must
            // not be recreated or fed — that would either resurrect dead
            // state or corrupt a fresh run's turn-flag tracking.
            if !state.entries.contains_key(agent_id) {
                return;
            }
            let pipeline = state.pipelines.entry(agent_id.clone()).or_default();
            pipeline.process_line(line, backend.as_ref())
        };

        if let Some(session_id) = &outcome.session_id {
            self.0.bus.emit(BusEvent::SessionId { agent_id: agent_id.clone(), session_id: session_id.clone() });
        }

        if let Some(event) = outcome.event {
            let now = crate::clock::now_ms();
            self.0.bus.emit(BusEvent::Activity { agent_id: agent_id.clone(), now_ms: now });
            self.0.bus.emit(BusEvent::Event { agent_id: agent_id.clone(), event });
        }

        for frame in &outcome.outputs {
            self.0.callbacks.on_output(agent_id, frame);
        }
    }

    async fn read_stderr(&self, agent_id: AgentId, stderr: ChildStderr, cancel: CancellationToken) {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) => {
                    let mut state = self.0.state.lock();
                    if !state.entries.contains_key(&agent_id) {
                        continue;
                    }
                    let tail = state.stderr_tails.entry(agent_id.clone()).or_default();
                    tail.push_str(&line);
                    tail.push('\n');
                    if tail.len() > crate::STDERR_TAIL_CAPACITY {
                        let overflow = tail.len() - crate::STDERR_TAIL_CAPACITY;
                        tail.drain(0..overflow);
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;

fn decode_exit_status(status: std::io::Result<std::process::ExitStatus>) -> (Option<i32>, Option<String>) {
    match status {
        Ok(status) => {
            let exit_code = status.code();
            #[cfg(unix)]
            let signal = {
                use std::os::unix::process::ExitStatusExt;
                status
                    .signal()
                    .and_then(|num| nix::sys::signal::Signal::try_from(num).ok())
                    .map(|s| s.to_string())
            };
            #[cfg(not(unix))]
            let signal = None;
            (exit_code, signal)
        }
        Err(_) => (None, None),
    }
}
