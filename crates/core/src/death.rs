// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Death records, kept in a bounded ring by the watchdog.

use serde::{Deserialize, Serialize};

use crate::AgentId;

/// A single non-clean (or watchdog-detected) termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathRecord {
    pub agent_id: AgentId,
    pub pid: u32,
    pub exit_code: Option<i32>,
    pub signal: Option<String>,
    pub runtime_ms: u64,
    pub was_tracked: bool,
    pub timestamp_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr_tail: Option<String>,
}

/// Maximum number of death records retained; the oldest is dropped first.
pub const DEATH_RING_CAPACITY: usize = 50;

/// Push a death record onto a ring, trimming the head once over capacity.
pub fn push_bounded(ring: &mut Vec<DeathRecord>, record: DeathRecord) {
    ring.push(record);
    if ring.len() > DEATH_RING_CAPACITY {
        let overflow = ring.len() - DEATH_RING_CAPACITY;
        ring.drain(0..overflow);
    }
}

#[cfg(test)]
#[path = "death_tests.rs"]
mod tests;
