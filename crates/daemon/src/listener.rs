// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accepts connections on the daemon's Unix socket and dispatches each
//! framed [`Request`] to the runner, supervisor or fleet state. `run`
//! requests keep the connection open and stream frames until the agent
//! completes; every other request gets exactly one response frame.

use std::sync::Arc;

use tc_core::AgentId;
use tc_runner::Runner;
use tc_supervisor::Supervisor;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::bridge::{DaemonCallbacks, FleetState};
use crate::protocol::{Request, Response};
use crate::protocol_wire::{self, DEFAULT_TIMEOUT};

pub struct ListenCtx {
    pub runner: Runner,
    pub supervisor: Supervisor,
    pub fleet: Arc<FleetState>,
    pub callbacks: Arc<DaemonCallbacks>,
    pub shutdown: Arc<Notify>,
}

pub struct Listener {
    socket: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(socket: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { socket, ctx }
    }

    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                protocol_wire::ProtocolError::ConnectionClosed => debug!("client disconnected"),
                                protocol_wire::ProtocolError::Timeout => warn!("connection timed out"),
                                e => error!(error = %e, "connection error"),
                            }
                        }
                    });
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, ctx: &ListenCtx) -> Result<(), protocol_wire::ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();
    let request: Request = protocol_wire::read_json(&mut reader, DEFAULT_TIMEOUT).await?;
    info!(?request, "received request");

    if let Request::Run(req) = request {
        return handle_run(req, ctx, writer).await;
    }

    let response = handle_request(request, ctx).await;
    protocol_wire::write_json(&mut writer, &response, DEFAULT_TIMEOUT).await
}

async fn handle_run(
    req: tc_core::Request,
    ctx: &ListenCtx,
    mut writer: tokio::net::unix::OwnedWriteHalf,
) -> Result<(), protocol_wire::ProtocolError> {
    let agent_id = req.agent_id.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    ctx.callbacks.on_run_request(&req);
    ctx.callbacks.subscribe(agent_id.clone(), tx);

    if let Err(e) = ctx.runner.run(req).await {
        let _ = protocol_wire::write_json(&mut writer, &Response::Error { message: e.to_string() }, DEFAULT_TIMEOUT).await;
        return Ok(());
    }

    while let Some(frame) = rx.recv().await {
        let is_complete = matches!(frame, Response::Complete { .. });
        protocol_wire::write_json(&mut writer, &frame, DEFAULT_TIMEOUT).await?;
        if is_complete {
            break;
        }
    }
    Ok(())
}

async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Run(_) => unreachable!("Run is handled by handle_run"),

        Request::Stop { agent_id } => {
            ctx.runner.stop(&agent_id);
            Response::Ok
        }

        Request::Interrupt { agent_id } => {
            if ctx.runner.interrupt(&agent_id) {
                Response::Ok
            } else {
                Response::Error { message: format!("agent {agent_id} is not running") }
            }
        }

        Request::SendMessage { agent_id, message } => {
            if ctx.runner.send_message(&agent_id, &message).await {
                Response::Ok
            } else {
                Response::Error { message: format!("could not write to agent {agent_id}") }
            }
        }

        Request::Status => Response::Status { agents: ctx.runner.get_active_processes_state() },

        Request::DeathHistory => Response::DeathHistory { deaths: ctx.runner.get_death_history() },

        Request::LatestReport => Response::Report { report: ctx.supervisor.latest_report() },

        Request::GenerateReport => Response::Report { report: Some(ctx.supervisor.generate_report().await) },

        Request::SupervisorHistory { agent_id } => Response::History { entries: ctx.supervisor.history_for(&agent_id) },

        Request::Tail { agent_id } => tail_response(ctx, &agent_id),

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

fn tail_response(ctx: &ListenCtx, agent_id: &AgentId) -> Response {
    if let Some(tail) = ctx.runner.get_stderr_tail(agent_id) {
        return Response::Tail { data: tail };
    }
    let from_death = ctx
        .runner
        .get_death_history()
        .into_iter()
        .rev()
        .find(|d| &d.agent_id == agent_id)
        .and_then(|d| d.stderr_tail);
    Response::Tail { data: from_death.unwrap_or_default() }
}
