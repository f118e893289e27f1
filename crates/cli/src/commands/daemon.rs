// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide daemon start|stop|status`: manage the background `tided` process.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::daemon_process::{cleanup_stale_socket, daemon_socket, probe_socket, read_daemon_pid, start_daemon_background, stop_daemon};

#[derive(Args, Debug)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Start the daemon in the background if it isn't already running.
    Start,
    /// Stop the running daemon.
    Stop,
    /// Report whether the daemon is reachable.
    Status,
}

pub async fn handle(args: DaemonArgs) -> Result<()> {
    match args.command {
        DaemonCommand::Start => start().await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Status => status().await,
    }
}

async fn start() -> Result<()> {
    let socket_path = daemon_socket()?;
    if socket_path.exists() && probe_socket(&socket_path) {
        println!("daemon already running");
        return Ok(());
    }
    cleanup_stale_socket()?;
    start_daemon_background()?;
    println!("daemon started");
    Ok(())
}

async fn stop() -> Result<()> {
    if let Ok(client) = DaemonClient::for_query() {
        if client.shutdown().await.is_ok() {
            println!("daemon shutting down");
            return Ok(());
        }
    }

    if let Some(pid) = read_daemon_pid()? {
        stop_daemon(pid);
        println!("daemon stopped");
    } else {
        println!("daemon not running");
    }
    Ok(())
}

async fn status() -> Result<()> {
    let reachable = match DaemonClient::for_query() {
        Ok(client) => client.ping().await.is_ok(),
        Err(_) => false,
    };
    if reachable {
        println!("daemon running ({})", daemon_socket()?.display());
    } else {
        println!("daemon not running");
    }
    Ok(())
}
