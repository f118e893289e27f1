// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex as StdMutex;
use std::sync::Arc;
use tc_core::AgentId;

#[test]
fn dispatches_only_to_handlers_of_the_matching_kind() {
    let bus = EventBus::new();
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let seen2 = seen.clone();
    bus.on(Kind::Activity, move |_| seen2.lock().push("activity"));
    let seen3 = seen.clone();
    bus.on(Kind::ProcessSpawned, move |_| seen3.lock().push("spawned"));

    bus.emit(BusEvent::Activity {
        agent_id: AgentId::new("a"),
        now_ms: 1,
    });

    assert_eq!(*seen.lock(), vec!["activity"]);
}

#[test]
fn preserves_registration_order() {
    let bus = EventBus::new();
    let seen = Arc::new(StdMutex::new(Vec::new()));
    for n in 0..3 {
        let seen = seen.clone();
        bus.on(Kind::Activity, move |_| seen.lock().push(n));
    }
    bus.emit(BusEvent::Activity {
        agent_id: AgentId::new("a"),
        now_ms: 1,
    });
    assert_eq!(*seen.lock(), vec![0, 1, 2]);
}

#[test]
fn unsubscribe_removes_the_handler() {
    let bus = EventBus::new();
    let seen = Arc::new(StdMutex::new(0));
    let seen2 = seen.clone();
    let sub = bus.on(Kind::Activity, move |_| *seen2.lock() += 1);
    sub.unsubscribe();
    bus.emit(BusEvent::Activity {
        agent_id: AgentId::new("a"),
        now_ms: 1,
    });
    assert_eq!(*seen.lock(), 0);
}

#[test]
fn a_panicking_handler_does_not_stop_later_handlers() {
    let bus = EventBus::new();
    let seen = Arc::new(StdMutex::new(Vec::new()));
    bus.on(Kind::Activity, |_| panic!("boom"));
    let seen2 = seen.clone();
    bus.on(Kind::Activity, move |_| seen2.lock().push("second"));
    bus.emit(BusEvent::Activity {
        agent_id: AgentId::new("a"),
        now_ms: 1,
    });
    assert_eq!(*seen.lock(), vec!["second"]);
}
