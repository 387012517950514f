//! Progress observer.
//!
//! Replaces the event-emitter pattern with an injected, well-typed observer.
//! No global state: callers hand the engine an `Arc<dyn Observer>` (or use
//! `NullObserver`) and receive callbacks from checkpoint/restore/GC.

use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Event {
    Scan { path: String },
    Diff { path: String, patch_bytes: usize },
    Hash { path: String, bytes: usize },
    Write { path: String, bytes: usize },
    PatchApply { path: String, strategy: ApplyStrategy },
    GcMark { hash_or_key: String },
    GcSweep { hash_or_key: String, bytes_freed: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStrategy {
    Exact,
    Fuzzy,
    Snapshot,
}

pub trait Observer: Send + Sync {
    fn on_event(&self, event: Event);
}

/// Default observer: drops every event.
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&self, _event: Event) {}
}

pub fn null_observer() -> Arc<dyn Observer> {
    Arc::new(NullObserver)
}
