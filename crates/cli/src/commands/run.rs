// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide run`: a local single-agent smoke-test entry point. By default it
//! talks to (and auto-starts) the daemon; `--standalone` drives an
//! in-process [`tc_runner::Runner`] directly, for exercising the runner
//! without a daemon running.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tc_core::{AgentId, IdGen, NormalizedEvent, PermissionMode, Request as RunRequest, UuidIdGen};
use tc_daemon::protocol::{Request, Response};

use crate::client::DaemonClient;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// The prompt to send the agent.
    pub prompt: String,

    /// Agent ID to run under (defaults to a fresh UUID).
    #[arg(long)]
    pub agent_id: Option<String>,

    /// Working directory for the agent (defaults to the current directory).
    #[arg(long, short = 'C')]
    pub cwd: Option<PathBuf>,

    /// Model override passed straight through to the backend.
    #[arg(long)]
    pub model: Option<String>,

    /// Named custom agent/persona to run as.
    #[arg(long)]
    pub custom_agent: Option<String>,

    /// Resume an existing backend session instead of starting a new one.
    #[arg(long)]
    pub session_id: Option<String>,

    /// Skip permission prompts (otherwise interactive in-directory edits only).
    #[arg(long)]
    pub bypass_permissions: bool,

    /// Drive an in-process runner directly instead of talking to the daemon.
    #[arg(long)]
    pub standalone: bool,
}

fn build_request(args: &RunArgs) -> Result<RunRequest> {
    let agent_id = AgentId::new(args.agent_id.clone().unwrap_or_else(|| UuidIdGen.next()));
    let working_dir = match &args.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    Ok(RunRequest {
        agent_id,
        prompt: args.prompt.clone(),
        working_dir,
        session_id: args.session_id.clone(),
        model: args.model.clone(),
        permission_mode: if args.bypass_permissions { PermissionMode::Bypass } else { PermissionMode::Interactive },
        use_chrome: None,
        system_prompt: None,
        force_new_session: None,
        custom_agent: args.custom_agent.clone(),
        backend_specific_config: None,
    })
}

pub async fn handle(args: RunArgs) -> Result<()> {
    let request = build_request(&args)?;
    if args.standalone {
        run_standalone(request).await
    } else {
        run_via_daemon(request).await
    }
}

async fn run_via_daemon(request: RunRequest) -> Result<()> {
    let client = DaemonClient::for_action().await?;
    let agent_id = request.agent_id.clone();
    let mut success = false;

    client
        .run_streaming(&Request::Run(request), |frame| match frame {
            Response::Output { line, .. } => println!("{line}"),
            Response::Event { event, .. } => print_event(event),
            Response::Complete { success: ok, .. } => success = *ok,
            Response::Error { message } => eprintln!("error: {message}"),
            _ => {}
        })
        .await?;

    println!();
    println!("agent {agent_id}: {}", if success { "completed" } else { "failed" });
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_event(event: &NormalizedEvent) {
    match event {
        NormalizedEvent::ToolStart { tool_name, .. } => println!("[tool] {tool_name}"),
        NormalizedEvent::StepComplete { result_text: Some(text), .. } => println!("[step] {text}"),
        NormalizedEvent::StepComplete { .. } => println!("[step] complete"),
        _ => {}
    }
}

async fn run_standalone(request: RunRequest) -> Result<()> {
    use tc_adapters::{env as adapters_env, ClaudeBackend};
    use tc_runner::Runner;

    let data_dir = crate::daemon_process::daemon_dir()?;
    let (callbacks, mut done) = StandaloneCallbacks::new();
    let runner = Runner::new(Arc::new(ClaudeBackend), Arc::new(callbacks), &data_dir, adapters_env::tide_server_url()).await;

    runner.run(request).await?;
    let success = done.recv().await.unwrap_or(false);
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

struct StandaloneCallbacks {
    tx: tokio::sync::mpsc::UnboundedSender<bool>,
}

impl StandaloneCallbacks {
    fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<bool>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl tc_runner::RunnerCallbacks for StandaloneCallbacks {
    fn on_event(&self, _agent_id: &AgentId, event: &NormalizedEvent) {
        print_event(event);
    }

    fn on_output(&self, _agent_id: &AgentId, frame: &tc_adapters::pipeline::OutputFrame) {
        println!("{frame:?}");
    }

    fn on_session_id(&self, agent_id: &AgentId, session_id: &str) {
        eprintln!("[session] {agent_id}: {session_id}");
    }

    fn on_complete(&self, agent_id: &AgentId, success: bool) {
        println!();
        println!("agent {agent_id}: {}", if success { "completed" } else { "failed" });
        let _ = self.tx.send(success);
    }

    fn on_error(&self, agent_id: &AgentId, message: &str) {
        eprintln!("[error] {agent_id}: {message}");
    }
}
