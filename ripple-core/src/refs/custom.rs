//! Custom refs: the caller decides when a read is tracked and when readers
//! are notified. No equality check is applied on write.

use std::rc::Rc;

use super::{track_ref_value, trigger_ref_value, Ref, RefKind, RefSource};
use crate::error::Result;
use crate::reactive::Runtime;
use crate::value::{ObjectId, Value};

/// Track and trigger callbacks handed to a custom ref's factory.
#[derive(Clone)]
pub struct RefTracker {
    runtime: Runtime,
    id: ObjectId,
}

impl RefTracker {
    /// Record that the running effect read this ref.
    pub fn track(&self) {
        track_ref_value(&self.runtime, self.id);
    }

    /// Notify every effect that read this ref.
    pub fn trigger(&self) {
        trigger_ref_value(&self.runtime, self.id);
    }
}

struct CustomRef {
    tracker: RefTracker,
    getter: Box<dyn Fn() -> Value>,
    setter: Box<dyn Fn(Value)>,
}

impl RefSource for CustomRef {
    fn id(&self) -> ObjectId {
        self.tracker.id
    }

    fn kind(&self) -> RefKind {
        RefKind::Custom
    }

    fn get(&self) -> Value {
        (self.getter)()
    }

    fn get_untracked(&self) -> Value {
        self.tracker.runtime.untracked(|| (self.getter)())
    }

    fn set(&self, value: Value) -> Result<()> {
        (self.setter)(value);
        Ok(())
    }

    fn trigger(&self) {
        self.tracker.trigger();
    }
}

impl Runtime {
    /// Build a ref from a factory returning its getter and setter.
    ///
    /// The factory receives a [`RefTracker`]; the getter is expected to call
    /// `track` and the setter `trigger`.
    pub fn custom_ref<F, G, S>(&self, factory: F) -> Ref
    where
        F: FnOnce(RefTracker) -> (G, S),
        G: Fn() -> Value + 'static,
        S: Fn(Value) + 'static,
    {
        let tracker = RefTracker {
            runtime: self.clone(),
            id: ObjectId::next(),
        };
        let (getter, setter) = factory(tracker.clone());
        Ref::from_source(Rc::new(CustomRef {
            tracker,
            getter: Box::new(getter),
            setter: Box::new(setter),
        }))
    }
}
