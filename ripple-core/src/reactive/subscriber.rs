//! Subscriber types for the reactive system.
//!
//! A subscriber is anything the graph can notify: in practice every
//! subscriber is an effect (plain effects, and the effect behind each
//! computed value).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::graph::{TrackKey, TrackOp, TriggerOp};
use crate::value::ObjectId;

/// Unique identifier for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened, as reported to the debug hooks of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugOp {
    Track(TrackOp),
    Trigger(TriggerOp),
}

/// Event passed to `on_track` and `on_trigger` hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct DebuggerEvent {
    pub effect: EffectId,
    pub target: ObjectId,
    pub op: DebugOp,
    pub key: Option<TrackKey>,
}

/// Something the graph can notify when a dependency changes.
pub(crate) trait Subscriber {
    /// A dependency changed: run the scheduler, or re-run.
    fn notify(&self, event: &DebuggerEvent);

    /// A new edge was recorded for this subscriber.
    fn on_track(&self, event: &DebuggerEvent);

    /// Computed subscribers are notified before plain effects, so a
    /// computed is marked dirty before anything reads it again.
    fn is_computed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_ids_are_unique() {
        let id1 = EffectId::new();
        let id2 = EffectId::new();
        let id3 = EffectId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }
}
