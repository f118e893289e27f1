// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide history <agent-id>`: the per-agent supervisor analysis trail.

use anyhow::Result;
use clap::Args;
use tc_core::AgentId;

use crate::client::DaemonClient;
use crate::output::{format_time_ago, OutputFormat};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub agent_id: String,
}

pub async fn handle(args: HistoryArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let entries = client.supervisor_history(&AgentId::new(args.agent_id)).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("no history recorded for this agent");
                return Ok(());
            }
            for entry in &entries {
                println!("{}  [{:?}]  {}", format_time_ago(entry.timestamp_ms), entry.analysis.progress, entry.analysis.status_description);
            }
        }
    }
    Ok(())
}
