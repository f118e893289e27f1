// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity narratives: short human-readable lines derived from events.

use serde::{Deserialize, Serialize};

use crate::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeKind {
    ToolUse,
    TaskStart,
    TaskComplete,
    Error,
    Thinking,
    Output,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityNarrative {
    pub id: String,
    pub agent_id: AgentId,
    pub timestamp_ms: u64,
    pub kind: NarrativeKind,
    pub narrative: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// Push onto a per-agent FIFO list, dropping the oldest once over `cap`.
pub fn push_bounded(list: &mut Vec<ActivityNarrative>, item: ActivityNarrative, cap: usize) {
    list.push(item);
    if list.len() > cap {
        let overflow = list.len() - cap;
        list.drain(0..overflow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u8) -> ActivityNarrative {
        ActivityNarrative {
            id: n.to_string(),
            agent_id: AgentId::new("a"),
            timestamp_ms: n as u64,
            kind: NarrativeKind::Output,
            narrative: "x".into(),
            tool_name: None,
        }
    }

    #[test]
    fn respects_cap() {
        let mut list = Vec::new();
        for n in 0..25 {
            push_bounded(&mut list, item(n), 20);
        }
        assert_eq!(list.len(), 20);
        assert_eq!(list.first().unwrap().id, "5");
    }
}
