// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal Event Bus (C4): a typed, synchronous pub/sub used within the
//! runner to decouple the stdout pipeline from lifecycle, watchdog and
//! restart policy. A closed set of event kinds, dispatched in registration
//! order; handlers must not panic across this boundary, so they're run
//! behind `catch_unwind` and a panicking handler is logged and skipped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tc_core::{AgentId, NormalizedEvent};
use tracing::error;

/// The closed set of internal bus event kinds.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Activity { agent_id: AgentId, now_ms: u64 },
    SessionId { agent_id: AgentId, session_id: String },
    ProcessSpawned { agent_id: AgentId, pid: u32 },
    ProcessSpawnError { agent_id: AgentId, message: String },
    ProcessClosed { agent_id: AgentId, exit_code: Option<i32>, signal: Option<String> },
    WatchdogMissingProcess { agent_id: AgentId },
    Event { agent_id: AgentId, event: NormalizedEvent },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Activity,
    SessionId,
    ProcessSpawned,
    ProcessSpawnError,
    ProcessClosed,
    WatchdogMissingProcess,
    Event,
}

impl BusEvent {
    pub fn kind(&self) -> Kind {
        match self {
            BusEvent::Activity { .. } => Kind::Activity,
            BusEvent::SessionId { .. } => Kind::SessionId,
            BusEvent::ProcessSpawned { .. } => Kind::ProcessSpawned,
            BusEvent::ProcessSpawnError { .. } => Kind::ProcessSpawnError,
            BusEvent::ProcessClosed { .. } => Kind::ProcessClosed,
            BusEvent::WatchdogMissingProcess { .. } => Kind::WatchdogMissingProcess,
            BusEvent::Event { .. } => Kind::Event,
        }
    }
}

type Handler = Box<dyn Fn(&BusEvent) + Send + Sync>;

struct Subscription {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    activity: Vec<Subscription>,
    session_id: Vec<Subscription>,
    process_spawned: Vec<Subscription>,
    process_spawn_error: Vec<Subscription>,
    process_closed: Vec<Subscription>,
    watchdog_missing_process: Vec<Subscription>,
    event: Vec<Subscription>,
}

impl Registry {
    fn slot_mut(&mut self, kind: Kind) -> &mut Vec<Subscription> {
        match kind {
            Kind::Activity => &mut self.activity,
            Kind::SessionId => &mut self.session_id,
            Kind::ProcessSpawned => &mut self.process_spawned,
            Kind::ProcessSpawnError => &mut self.process_spawn_error,
            Kind::ProcessClosed => &mut self.process_closed,
            Kind::WatchdogMissingProcess => &mut self.watchdog_missing_process,
            Kind::Event => &mut self.event,
        }
    }
}

/// A handle returned by [`EventBus::on`]; dropping it does nothing — call
/// [`Unsubscribe::unsubscribe`] explicitly, mirroring the source's
/// function-returning-a-function shape.
pub struct Unsubscribe {
    bus: EventBus,
    kind: Kind,
    id: u64,
}

impl Unsubscribe {
    pub fn unsubscribe(self) {
        let mut registry = self.bus.inner.registry.lock();
        let slot = registry.slot_mut(self.kind);
        slot.retain(|s| s.id != self.id);
    }
}

struct Inner {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

/// Cloneable handle to the bus; all clones share the same registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a handler for `kind`. Returns an unsubscribe handle.
    pub fn on<F>(&self, kind: Kind, handler: F) -> Unsubscribe
    where
        F: Fn(&BusEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let mut registry = self.inner.registry.lock();
        registry.slot_mut(kind).push(Subscription {
            id,
            handler: Box::new(handler),
        });
        Unsubscribe {
            bus: self.clone(),
            kind,
            id,
        }
    }

    /// Dispatch `event` synchronously to every handler registered for its
    /// kind, in registration order. A panicking handler is caught, logged,
    /// and does not prevent later handlers from running.
    ///
    /// Holds the registry lock for the duration of dispatch: handlers are
    /// expected to be fast and non-blocking, matching the source's
    /// single-threaded dispatcher.
    pub fn emit(&self, event: BusEvent) {
        let registry = self.inner.registry.lock();
        let slot = match event.kind() {
            Kind::Activity => &registry.activity,
            Kind::SessionId => &registry.session_id,
            Kind::ProcessSpawned => &registry.process_spawned,
            Kind::ProcessSpawnError => &registry.process_spawn_error,
            Kind::ProcessClosed => &registry.process_closed,
            Kind::WatchdogMissingProcess => &registry.watchdog_missing_process,
            Kind::Event => &registry.event,
        };
        dispatch(slot, &event);
    }
}

fn dispatch(slot: &[Subscription], event: &BusEvent) {
    for sub in slot {
        let result = catch_unwind(AssertUnwindSafe(|| (sub.handler)(event)));
        if result.is_err() {
            error!(kind = ?event.kind(), "bus handler panicked, continuing");
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
