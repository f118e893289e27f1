// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tide-commander daemon (`tided`)
//!
//! Background process that owns the agent runner and the supervisor, and
//! exposes both over a Unix socket. Started on demand by the `tide` CLI and
//! not normally invoked directly.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use tc_daemon::listener::{ListenCtx, Listener};
use tc_daemon::startup::{self, Config};
use tc_daemon::DaemonError;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("tided {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("tided {}", env!("CARGO_PKG_VERSION"));
                println!("tide-commander daemon - owns the agent runner and supervisor");
                println!();
                println!("The daemon is typically started by the `tide` CLI and should not");
                println!("be invoked directly. It listens on a Unix socket for commands.");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: tided [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    let log_guard = setup_logging(&config)?;

    info!("starting tide-commander daemon");

    let result = match startup::startup(&config).await {
        Ok(r) => r,
        Err(DaemonError::AlreadyRunning) => {
            eprintln!("tided is already running ({})", config.socket_path.display());
            drop(log_guard);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start daemon");
            drop(log_guard);
            return Err(e.into());
        }
    };

    let pid_path = tc_daemon::env::pid_path(&config.data_dir);
    let _ = std::fs::write(&pid_path, std::process::id().to_string());

    let ctx = Arc::new(ListenCtx {
        runner: result.runner.clone(),
        supervisor: result.supervisor,
        fleet: result.fleet,
        callbacks: result.callbacks,
        shutdown: Arc::clone(&result.shutdown),
    });
    let listener = Listener::new(result.listener, Arc::clone(&ctx));
    tokio::spawn(listener.run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %config.socket_path.display(), "daemon ready");
    println!("READY");

    tokio::select! {
        _ = result.shutdown.notified() => {
            info!("shutdown requested via command");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }

    // Persist and release every running agent (matches the hot-reload path)
    // rather than killing their processes outright.
    ctx.runner.stop_all(false);
    let _ = std::fs::remove_file(&config.socket_path);
    let _ = std::fs::remove_file(&pid_path);
    info!("daemon stopped");
    Ok(())
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(DaemonError::NoDataDir)?,
        config.log_path.file_name().ok_or(DaemonError::NoDataDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}
