// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide tail <agent-id>`: replay the last captured stderr bytes for an
//! agent, grounded on the runner's C5 `stderrTail` capture.

use anyhow::Result;
use clap::Args;
use tc_core::AgentId;

use crate::client::DaemonClient;

#[derive(Args, Debug)]
pub struct TailArgs {
    /// Agent ID (or prefix of one) to show captured stderr for.
    pub agent_id: String,
}

pub async fn handle(args: TailArgs) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let data = client.tail(&AgentId::new(args.agent_id)).await?;
    if data.is_empty() {
        eprintln!("no stderr captured for this agent");
    } else {
        print!("{data}");
        if !data.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}
