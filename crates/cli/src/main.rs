// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide` — CLI for local operation of the agent runner and supervisor
//! daemon: start/stop `tided`, run an agent, and query its state.

mod client;
mod commands;
mod daemon_process;
mod env;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{daemon, history, report, run, status, tail};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "tide", version, about = "tide-commander - agent runner and supervisor")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single agent (daemon-mediated, or --standalone for in-process)
    Run(run::RunArgs),
    /// Replay the last captured stderr for an agent
    Tail(tail::TailArgs),
    /// List currently running agents
    Status(status::StatusArgs),
    /// Show recent non-clean agent terminations
    Deaths(status::DeathsArgs),
    /// Show the supervisor's latest (or freshly generated) health report
    Report(report::ReportArgs),
    /// Show the supervisor's per-agent analysis history
    History(history::HistoryArgs),
    /// Manage the background daemon process
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run::handle(args).await,
        Commands::Tail(args) => tail::handle(args).await,
        Commands::Status(args) => status::handle(args, cli.output).await,
        Commands::Deaths(args) => status::handle_deaths(args, cli.output).await,
        Commands::Report(args) => report::handle(args, cli.output).await,
        Commands::History(args) => history::handle(args, cli.output).await,
        Commands::Daemon(args) => daemon::handle(args).await,
    }
}
