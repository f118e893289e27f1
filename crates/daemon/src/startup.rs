// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon config resolution and the startup sequence: bind the socket,
//! construct the runner and supervisor, and close the bridge's reference
//! cycle between them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tc_adapters::{AgentBackend, ClaudeBackend};
use tc_runner::Runner;
use tc_supervisor::Supervisor;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;

use crate::bridge::{DaemonCallbacks, FleetState, LoggingSupervisorCallbacks};
use crate::env;
use crate::DaemonError;

pub struct Config {
    pub data_dir: PathBuf,
    pub socket_path: PathBuf,
    pub log_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, DaemonError> {
        let data_dir = env::data_dir()?;
        std::fs::create_dir_all(&data_dir)?;
        let socket_path = env::socket_path(&data_dir);
        let log_path = env::log_path(&data_dir);
        Ok(Self { data_dir, socket_path, log_path })
    }
}

pub struct StartupResult {
    pub runner: Runner,
    pub supervisor: Supervisor,
    pub listener: UnixListener,
    pub shutdown: Arc<Notify>,
    pub callbacks: Arc<DaemonCallbacks>,
    pub fleet: Arc<FleetState>,
}

pub async fn startup(config: &Config) -> Result<StartupResult, DaemonError> {
    let listener = bind_socket(&config.socket_path).await?;

    let fleet = FleetState::new();
    let callbacks = DaemonCallbacks::new(Arc::clone(&fleet));
    let backend: Arc<dyn AgentBackend> = Arc::new(ClaudeBackend);
    let tide_server_url = tc_adapters::env::tide_server_url();

    let runner = Runner::new(backend.clone(), callbacks.clone(), &config.data_dir, tide_server_url).await;
    fleet.bind_runner(runner.clone());

    let supervisor = Supervisor::new(
        backend,
        Arc::clone(&fleet) as Arc<dyn tc_supervisor::AgentSnapshotProvider>,
        None,
        Arc::new(LoggingSupervisorCallbacks),
        &config.data_dir,
        None,
    );
    callbacks.bind_supervisor(supervisor.clone());

    Ok(StartupResult { runner, supervisor, listener, shutdown: Arc::new(Notify::new()), callbacks, fleet })
}

/// Bind the daemon's Unix socket, clearing a stale socket file left behind
/// by a daemon that didn't exit cleanly. If another daemon is actually
/// listening, refuse to start.
async fn bind_socket(path: &Path) -> Result<UnixListener, DaemonError> {
    match UnixListener::bind(path) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            if UnixStream::connect(path).await.is_ok() {
                return Err(DaemonError::AlreadyRunning);
            }
            std::fs::remove_file(path)?;
            Ok(UnixListener::bind(path)?)
        }
        Err(e) => Err(e.into()),
    }
}
