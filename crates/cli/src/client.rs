// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client: connects to `tided`'s Unix socket, auto-starting it for
//! action commands when it isn't already running.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tc_daemon::protocol::{Request, Response};
use tc_daemon::protocol_wire::{self, ProtocolError};
use thiserror::Error;
use tokio::net::UnixStream;

use crate::daemon_process::{cleanup_stale_socket, daemon_socket, probe_socket, start_daemon_background};
use crate::env::{poll_interval_ms, timeout_connect_ms, timeout_ipc_ms};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    DaemonNotRunning,
    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),
    #[error("timed out waiting for daemon to start")]
    DaemonStartTimeout,
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("daemon rejected request: {0}")]
    Rejected(String),
    #[error("unexpected response from daemon")]
    UnexpectedResponse,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not determine state directory")]
    NoStateDir,
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands (`run`, `stop`, ...): auto-start the daemon if
    /// it isn't already listening.
    pub async fn for_action() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) if probe_socket(&client.socket_path) => Ok(client),
            Ok(_) | Err(ClientError::DaemonNotRunning) => {
                cleanup_stale_socket()?;
                let child = start_daemon_background()?;
                Self::connect_with_retry(Duration::from_millis(timeout_connect_ms()), child).await
            }
            Err(e) => Err(e),
        }
    }

    /// For query commands (`status`, `tail`, ...): connect only, no auto-start.
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self { socket_path })
    }

    async fn connect_with_retry(timeout: Duration, mut child: std::process::Child) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(ClientError::DaemonStartFailed(format!("exited with {status}")));
            }
            match Self::connect() {
                Ok(client) if probe_socket(&client.socket_path) => return Ok(client),
                _ => tokio::time::sleep(Duration::from_millis(poll_interval_ms())).await,
            }
        }
        Err(ClientError::DaemonStartTimeout)
    }

    pub fn socket_path(&self) -> &std::path::Path {
        &self.socket_path
    }

    /// Send a request and read exactly one response frame.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let timeout = Duration::from_millis(timeout_ipc_ms());
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();
        protocol_wire::write_json(&mut writer, request, timeout).await?;
        Ok(protocol_wire::read_json(&mut reader, timeout).await?)
    }

    /// Send a `Run` request and call `on_frame` for every streamed
    /// `Event`/`Output`/`Complete` frame until the agent completes.
    pub async fn run_streaming(
        &self,
        request: &Request,
        mut on_frame: impl FnMut(&Response),
    ) -> Result<(), ClientError> {
        let timeout = Duration::from_millis(timeout_ipc_ms());
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();
        protocol_wire::write_json(&mut writer, request, timeout).await?;

        loop {
            let frame: Response = protocol_wire::read_json(&mut reader, protocol_wire::DEFAULT_TIMEOUT).await?;
            let done = matches!(frame, Response::Complete { .. } | Response::Error { .. });
            on_frame(&frame);
            if done {
                return Ok(());
            }
        }
    }

    fn reject<T>(resp: Response) -> Result<T, ClientError> {
        match resp {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn stop(&self, agent_id: &tc_core::AgentId) -> Result<(), ClientError> {
        match self.send(&Request::Stop { agent_id: agent_id.clone() }).await? {
            Response::Ok => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn interrupt(&self, agent_id: &tc_core::AgentId) -> Result<(), ClientError> {
        match self.send(&Request::Interrupt { agent_id: agent_id.clone() }).await? {
            Response::Ok => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn send_message(&self, agent_id: &tc_core::AgentId, message: &str) -> Result<(), ClientError> {
        match self.send(&Request::SendMessage { agent_id: agent_id.clone(), message: message.to_string() }).await? {
            Response::Ok => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn status(&self) -> Result<Vec<tc_runner::ActiveProcessInfo>, ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status { agents } => Ok(agents),
            other => Self::reject(other),
        }
    }

    pub async fn death_history(&self) -> Result<Vec<tc_core::DeathRecord>, ClientError> {
        match self.send(&Request::DeathHistory).await? {
            Response::DeathHistory { deaths } => Ok(deaths),
            other => Self::reject(other),
        }
    }

    pub async fn latest_report(&self) -> Result<Option<tc_core::SupervisorReport>, ClientError> {
        match self.send(&Request::LatestReport).await? {
            Response::Report { report } => Ok(report),
            other => Self::reject(other),
        }
    }

    pub async fn generate_report(&self) -> Result<Option<tc_core::SupervisorReport>, ClientError> {
        match self.send(&Request::GenerateReport).await? {
            Response::Report { report } => Ok(report),
            other => Self::reject(other),
        }
    }

    pub async fn supervisor_history(
        &self,
        agent_id: &tc_core::AgentId,
    ) -> Result<Vec<tc_core::supervisor::SupervisorHistoryEntry>, ClientError> {
        match self.send(&Request::SupervisorHistory { agent_id: agent_id.clone() }).await? {
            Response::History { entries } => Ok(entries),
            other => Self::reject(other),
        }
    }

    pub async fn tail(&self, agent_id: &tc_core::AgentId) -> Result<String, ClientError> {
        match self.send(&Request::Tail { agent_id: agent_id.clone() }).await? {
            Response::Tail { data } => Ok(data),
            other => Self::reject(other),
        }
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Self::reject(other),
        }
    }
}
