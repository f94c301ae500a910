//! Tracking Context
//!
//! The tracking context records which effect is currently running and
//! whether reads should be recorded at all.
//!
//! # Implementation
//!
//! There is exactly one "active effect" slot per runtime. Nested effects do
//! not push onto a stack; each effect remembers the effect that was active
//! when it started (its caller) and restores that caller when it finishes.
//!
//! Whether reads are recorded is a separate flag with its own save/restore
//! stack. Internal operations that read their own state (for example a
//! sequence `push` reading `length`) pause tracking so those reads do not
//! become dependencies of the calling effect.

use std::cell::{Cell, RefCell};

use super::EffectId;

/// Per-runtime tracking state.
#[derive(Debug)]
pub(crate) struct TrackingContext {
    /// The effect currently executing, if any.
    active: Cell<Option<EffectId>>,

    /// Whether reads are recorded.
    should_track: Cell<bool>,

    /// Saved values of `should_track`.
    saved: RefCell<Vec<bool>>,
}

impl TrackingContext {
    pub(crate) fn new() -> Self {
        Self {
            active: Cell::new(None),
            should_track: Cell::new(true),
            saved: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn active_effect(&self) -> Option<EffectId> {
        self.active.get()
    }

    pub(crate) fn set_active(&self, effect: Option<EffectId>) {
        self.active.set(effect);
    }

    /// True when a read right now would record a dependency.
    pub(crate) fn is_tracking(&self) -> bool {
        self.should_track.get() && self.active.get().is_some()
    }

    /// Stop recording reads until the matching `reset`.
    pub(crate) fn pause(&self) {
        self.saved.borrow_mut().push(self.should_track.get());
        self.should_track.set(false);
    }

    /// Record reads until the matching `reset`.
    pub(crate) fn enable(&self) {
        self.saved.borrow_mut().push(self.should_track.get());
        self.should_track.set(true);
    }

    /// Restore the state saved by the last `pause` or `enable`.
    pub(crate) fn reset(&self) {
        let last = self.saved.borrow_mut().pop();
        self.should_track.set(last.unwrap_or(true));
    }
}
