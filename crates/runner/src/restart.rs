// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart Policy (C6): decide whether a dead agent should be relaunched,
//! and with what bookkeeping. Kept as a pure function over plain values so
//! it can be tested without a live process.

use crate::{MAX_RESTART_ATTEMPTS, MIN_RUNTIME_FOR_RESTART_MS, RESTART_COOLDOWN_MS};

/// What the caller should do about a dead entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No restart: a clean exit, an explicit stop, or auto-restart is off.
    NoOp,
    /// Schedule a relaunch after `delay_ms`, with this restart count to
    /// stamp on the freshly spawned entry.
    Restart { delay_ms: u64, next_restart_count: u32 },
    /// A terminal condition; surface via `onError` and stop trying.
    Terminal(String),
}

pub const RESTART_BACKOFF_MS: u64 = 1_000;

/// Inputs needed to decide whether to restart. All times are milliseconds
/// since the Unix epoch.
pub struct DecisionInput {
    pub auto_restart_enabled: bool,
    pub has_last_request: bool,
    pub runtime_ms: u64,
    pub exit_code: Option<i32>,
    pub signal: Option<String>,
    pub restart_count: u32,
    pub last_restart_time_ms: Option<u64>,
    pub now_ms: u64,
}

/// `maybeAutoRestart`'s decision logic (spec §4.6), pure.
pub fn decide(input: &DecisionInput) -> Decision {
    if !input.auto_restart_enabled || !input.has_last_request {
        return Decision::NoOp;
    }

    if input.runtime_ms < MIN_RUNTIME_FOR_RESTART_MS {
        return Decision::Terminal(
            "Process exited too quickly after start - likely a configuration error.".to_string(),
        );
    }

    let clean_exit = input.exit_code == Some(0);
    let explicit_signal = matches!(input.signal.as_deref(), Some("SIGINT") | Some("SIGTERM"));
    if clean_exit || explicit_signal {
        return Decision::NoOp;
    }

    let effective_count = match input.last_restart_time_ms {
        Some(last) if input.now_ms.saturating_sub(last) > RESTART_COOLDOWN_MS => 0,
        Some(_) => input.restart_count,
        None => input.restart_count,
    };

    if effective_count >= MAX_RESTART_ATTEMPTS {
        return Decision::Terminal(format!(
            "Process keeps crashing - auto-restart disabled after {MAX_RESTART_ATTEMPTS} attempts. Manual intervention required."
        ));
    }

    Decision::Restart {
        delay_ms: RESTART_BACKOFF_MS,
        next_restart_count: effective_count + 1,
    }
}

#[cfg(test)]
#[path = "restart_tests.rs"]
mod tests;
