// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide status`: list active agents and `tide deaths`: recent non-clean
//! terminations, read from the daemon over IPC.

use anyhow::Result;
use clap::Args;

use crate::client::DaemonClient;
use crate::output::{format_time_ago, OutputFormat};

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub async fn handle(_args: StatusArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let agents = client.status().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&agents)?),
        OutputFormat::Text => {
            if agents.is_empty() {
                println!("no agents running");
                return Ok(());
            }
            println!("{:<24} {:>8} {:>12} {:>12} {:>10}", "AGENT", "PID", "STARTED", "LAST SEEN", "RESTARTS");
            for agent in &agents {
                println!(
                    "{:<24} {:>8} {:>12} {:>12} {:>10}",
                    agent.agent_id,
                    agent.pid,
                    format_time_ago(agent.start_time_ms),
                    format_time_ago(agent.last_activity_time_ms),
                    agent.restart_count,
                );
            }
        }
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct DeathsArgs {}

pub async fn handle_deaths(_args: DeathsArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let deaths = client.death_history().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&deaths)?),
        OutputFormat::Text => {
            if deaths.is_empty() {
                println!("no deaths recorded");
                return Ok(());
            }
            for death in &deaths {
                let cause = death.signal.clone().unwrap_or_else(|| death.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()));
                println!(
                    "{}  pid={}  {}  runtime={}ms  tracked={}  {}",
                    death.agent_id,
                    death.pid,
                    cause,
                    death.runtime_ms,
                    death.was_tracked,
                    format_time_ago(death.timestamp_ms),
                );
            }
        }
    }
    Ok(())
}
