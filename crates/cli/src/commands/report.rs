// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide report [--generate]`: the supervisor's latest health report.

use anyhow::Result;
use clap::Args;
use tc_core::SupervisorReport;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Force the supervisor to analyze now instead of returning the cached report.
    #[arg(long)]
    pub generate: bool,
}

pub async fn handle(args: ReportArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let report = if args.generate { client.generate_report().await? } else { client.latest_report().await? };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => match report {
            None => println!("no report available yet"),
            Some(report) => print_report(&report),
        },
    }
    Ok(())
}

fn print_report(report: &SupervisorReport) {
    println!("report {} ({:?})", report.id, report.overall_status);
    for agent in &report.agent_summaries {
        println!("  {} [{:?}] {}", agent.agent_name, agent.progress, agent.status_description);
        if !agent.concerns.is_empty() {
            println!("    concerns: {}", agent.concerns.join(", "));
        }
    }
    for insight in &report.insights {
        println!("insight: {insight}");
    }
    for rec in &report.recommendations {
        println!("recommendation: {rec}");
    }
}
