// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watchdog (C7): periodic liveness sweep over tracked pids, and pattern
//! analysis over recent deaths.

use tc_core::DeathRecord;

use crate::lifecycle::is_alive;

/// Window, in milliseconds, over which `analyze_crash_pattern` looks back.
pub const CRASH_PATTERN_WINDOW_MS: u64 = 60_000;

pub(crate) fn pid_missing(pid: u32) -> bool {
    !is_alive(pid)
}

/// Decode a handful of well-known exit codes into a human phrase.
fn decode_exit_code(code: i32) -> Option<&'static str> {
    match code {
        137 => Some("likely OOM-killed (exit 137)"),
        139 => Some("segmentation fault (exit 139)"),
        1 => Some("generic failure (exit 1)"),
        _ => None,
    }
}

/// Pattern analysis over the deaths in the last `CRASH_PATTERN_WINDOW_MS`
/// (spec §4.7). Returns zero or more human-readable flags to log.
pub fn analyze_crash_pattern(ring: &[DeathRecord], now_ms: u64) -> Vec<String> {
    let recent: Vec<&DeathRecord> = ring
        .iter()
        .filter(|d| now_ms.saturating_sub(d.timestamp_ms) <= CRASH_PATTERN_WINDOW_MS)
        .collect();

    if recent.len() < 3 {
        return Vec::new();
    }

    let mut flags = Vec::new();
    flags.push(format!("{} deaths in the last 60s", recent.len()));

    let first_signal = recent[0].signal.as_deref();
    if first_signal.is_some() && recent.iter().all(|d| d.signal.as_deref() == first_signal) {
        flags.push("possible external kill or resource exhaustion".to_string());
    }

    let first_code = recent[0].exit_code;
    if first_code.is_some() && recent.iter().all(|d| d.exit_code == first_code) {
        if let Some(code) = first_code {
            if let Some(decoded) = decode_exit_code(code) {
                flags.push(decoded.to_string());
            }
        }
    }

    let fast_crashes = recent.iter().filter(|d| d.runtime_ms < 5_000).count();
    if fast_crashes >= 2 {
        flags.push("likely startup/config error".to_string());
    }

    flags
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
