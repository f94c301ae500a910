//! Observation Wrappers
//!
//! A [`Reactive`] wraps one raw [`Object`] and exposes the same shape through
//! explicit accessors. Reads record dependencies, writes notify dependents.
//!
//! The handlers are split by target shape:
//!
//! - records and sequences live in `base.rs`,
//! - maps, sets and their weak variants live in `collection.rs`.
//!
//! The generic accessors below ([`Reactive::get`], [`Reactive::set`], ...)
//! dispatch on the shape of the wrapped target.

use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::{Runtime, WeakRuntime};
use crate::error::Result;
use crate::value::{Object, ObjectId, TargetKind, Value, WeakObject};

struct ReactiveCell {
    id: ObjectId,
    raw: Object,
    runtime: Runtime,
}

/// Observation wrapper around a raw target.
///
/// Cloning the handle returns the same wrapper; equality is identity.
#[derive(Clone)]
pub struct Reactive {
    cell: Rc<ReactiveCell>,
}

impl Reactive {
    /// A wrapper with identity `id`. The registry hands out one id per
    /// raw target and reuses it whenever the wrapper is rebuilt.
    pub(crate) fn with_id(runtime: Runtime, raw: Object, id: ObjectId) -> Self {
        Self {
            cell: Rc::new(ReactiveCell { id, raw, runtime }),
        }
    }

    /// Identity of the wrapper itself (distinct from the raw target's).
    /// Stable for as long as the raw target lives.
    pub fn id(&self) -> ObjectId {
        self.cell.id
    }

    /// The wrapped target.
    pub fn raw(&self) -> &Object {
        &self.cell.raw
    }

    pub fn kind(&self) -> TargetKind {
        self.cell.raw.kind()
    }

    /// The runtime this wrapper reports to.
    pub fn runtime(&self) -> &Runtime {
        &self.cell.runtime
    }

    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn downgrade(&self) -> WeakReactive {
        WeakReactive {
            cell: Rc::downgrade(&self.cell),
            id: self.cell.id,
            raw: self.cell.raw.downgrade(),
            runtime: self.cell.runtime.downgrade(),
        }
    }

    /// Id under which dependencies of this target are recorded.
    pub(crate) fn target_id(&self) -> ObjectId {
        self.cell.raw.id()
    }

    // ------------------------------------------------------------------
    // Shape-generic accessors
    // ------------------------------------------------------------------

    /// Read a property (records, sequences) or an entry (maps).
    ///
    /// Nested targets come back wrapped. Sets and weak sets always read
    /// `Undefined`.
    pub fn get(&self, key: impl Into<Value>) -> Value {
        let key = key.into();
        if self.kind().is_collection() {
            self.entry_get(&key)
        } else {
            self.prop_get(&key)
        }
    }

    /// Write a property (records, sequences) or an entry (maps).
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if self.kind().is_collection() {
            self.entry_set(key, value.into())
        } else {
            self.prop_set(&key, value.into())
        }
    }

    /// Delete a property or entry. Returns whether it existed.
    pub fn delete(&self, key: impl Into<Value>) -> Result<bool> {
        let key = key.into();
        if self.kind().is_collection() {
            Ok(self.entry_delete(&key))
        } else {
            self.prop_delete(&key)
        }
    }

    pub fn has(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        if self.kind().is_collection() {
            self.entry_has(&key)
        } else {
            self.prop_has(&key)
        }
    }

    /// Record field names, sequence indices, map keys or set members.
    ///
    /// Records track their key set, sequences track `length`, maps track
    /// only their key set (value writes do not invalidate the caller).
    pub fn keys(&self) -> Result<Vec<Value>> {
        if self.kind().is_collection() {
            self.entry_keys()
        } else {
            Ok(self.prop_keys())
        }
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reactive({} {} -> {})", self.kind(), self.id(), self.raw().id())
    }
}

/// Non-owning handle to a wrapper.
///
/// The handle outlives the wrapper value itself: while the raw target and
/// its runtime are alive, upgrading rebuilds the wrapper under the same id.
#[derive(Clone)]
pub(crate) struct WeakReactive {
    cell: Weak<ReactiveCell>,
    id: ObjectId,
    raw: WeakObject,
    runtime: WeakRuntime,
}

impl WeakReactive {
    pub(crate) fn id(&self) -> ObjectId {
        self.id
    }

    /// The wrapper, if a handle to it is still held somewhere.
    pub(crate) fn live(&self) -> Option<Reactive> {
        self.cell.upgrade().map(|cell| Reactive { cell })
    }

    pub(crate) fn upgrade(&self) -> Option<Reactive> {
        if let Some(reactive) = self.live() {
            return Some(reactive);
        }
        let raw = self.raw.upgrade()?;
        self.runtime.upgrade()?.wrap(&raw)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.raw.is_alive() && self.runtime.is_alive()
    }
}

/// Whether the value is an observation wrapper.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Reactive(_))
}

/// Follow a wrapper back to its raw target.
pub fn to_raw(value: &Value) -> Value {
    value.to_raw()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapper_identity_differs_from_raw() {
        let runtime = Runtime::new();
        let raw = Object::record();
        let wrapped = runtime.wrap(&raw).unwrap();

        assert_ne!(wrapped.id(), raw.id());
        assert!(wrapped.raw().ptr_eq(&raw));
        assert_eq!(wrapped.target_id(), raw.id());
    }

    #[test]
    fn dispatch_follows_target_shape() {
        let runtime = Runtime::new();

        let record = runtime.reactive(Value::from(json!({ "a": 1 })));
        let record = record.as_reactive().unwrap();
        assert_eq!(record.get("a"), Value::from(1));
        assert!(record.has("a"));

        let map = runtime.wrap(&Object::map()).unwrap();
        map.set("a", 2).unwrap();
        assert_eq!(map.get("a"), Value::from(2));
        assert_eq!(map.keys().unwrap(), vec![Value::from("a")]);
        assert!(map.delete("a").unwrap());
        assert!(!map.has("a"));
    }

    #[test]
    fn helpers_recognize_wrappers() {
        let runtime = Runtime::new();
        let raw = Object::sequence([1, 2]);
        let wrapped = runtime.reactive(raw.clone());

        assert!(is_reactive(&wrapped));
        assert!(!is_reactive(&Value::Object(raw.clone())));
        assert_eq!(to_raw(&wrapped), Value::Object(raw.clone()));
        assert_eq!(to_raw(&Value::from(3)), Value::from(3));
    }

    #[test]
    fn weak_handle_follows_the_raw_target() {
        let runtime = Runtime::new();
        let raw = Object::record();
        let wrapped = runtime.wrap(&raw).unwrap();
        let id = wrapped.id();
        let weak = wrapped.downgrade();

        drop(wrapped);
        assert!(weak.live().is_none());
        assert!(weak.is_alive());
        assert_eq!(weak.upgrade().map(|r| r.id()), Some(id));

        drop(raw);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn rewrapping_keeps_the_wrapper_id() {
        let runtime = Runtime::new();
        let raw = Object::record();
        let first = runtime.wrap(&raw).unwrap().id();
        let second = runtime.wrap(&raw).unwrap().id();
        assert_eq!(first, second);

        let other = Runtime::new();
        assert_ne!(other.wrap(&raw).unwrap().id(), first);
    }
}
