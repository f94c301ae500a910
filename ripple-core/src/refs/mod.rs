//! Refs
//!
//! A [`Ref`] is a single boxed reactive value. Reading it tracks the ref's
//! `value` key; writing it notifies readers when the value changed.
//!
//! Every kind of ref shares the same handle type and differs only in where
//! the value comes from:
//!
//! - plain refs box a value and deep-wrap targets stored in them,
//! - shallow refs box a value as-is,
//! - custom refs delegate to user-supplied getter and setter (`custom.rs`),
//! - computed refs cache a derived value (`computed.rs`),
//! - property refs view one property of a target (`property.rs`).

mod computed;
mod custom;
mod property;

pub use custom::RefTracker;
pub use property::{proxy_refs, RefsProxy};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::Result;
use crate::graph::{TrackKey, TrackOp, TriggerOp};
use crate::reactive::Runtime;
use crate::value::{has_changed, ObjectId, TargetKind, Value};

/// Where a ref's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Plain,
    Shallow,
    Custom,
    Computed,
    Property,
}

/// Behavior behind a [`Ref`] handle.
pub(crate) trait RefSource {
    fn id(&self) -> ObjectId;
    fn kind(&self) -> RefKind;

    /// Read the value, tracking the read.
    fn get(&self) -> Value;

    /// Read the value without tracking.
    fn get_untracked(&self) -> Value;

    fn set(&self, value: Value) -> Result<()>;

    /// Notify readers without changing the value.
    fn trigger(&self);
}

/// Handle to a boxed reactive value. Cloning shares the box.
#[derive(Clone)]
pub struct Ref {
    source: Rc<dyn RefSource>,
}

impl Ref {
    pub(crate) fn from_source(source: Rc<dyn RefSource>) -> Self {
        Self { source }
    }

    /// The current value. Tracks the read.
    pub fn get(&self) -> Value {
        self.source.get()
    }

    pub fn get_untracked(&self) -> Value {
        self.source.get_untracked()
    }

    /// Replace the value.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.source.set(value.into())
    }

    pub fn id(&self) -> ObjectId {
        self.source.id()
    }

    pub fn kind(&self) -> RefKind {
        self.source.kind()
    }

    pub(crate) fn downgrade(&self) -> WeakRef {
        WeakRef(Rc::downgrade(&self.source))
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({:?} {})", self.kind(), self.id())
    }
}

/// Non-owning handle to a ref.
#[derive(Clone)]
pub(crate) struct WeakRef(Weak<dyn RefSource>);

impl WeakRef {
    pub(crate) fn upgrade(&self) -> Option<Ref> {
        self.0.upgrade().map(Ref::from_source)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// Track a read of a ref's `value` key.
pub(crate) fn track_ref_value(runtime: &Runtime, id: ObjectId) {
    runtime.track(id, TrackOp::Get, TrackKey::value());
}

/// Notify readers of a ref's `value` key.
pub(crate) fn trigger_ref_value(runtime: &Runtime, id: ObjectId) {
    runtime.trigger(
        id,
        TargetKind::Ref,
        TriggerOp::Set,
        Some(TrackKey::value()),
        None,
    );
}

// ----------------------------------------------------------------------------
// Plain and shallow refs
// ----------------------------------------------------------------------------

struct BoxedRef {
    id: ObjectId,
    runtime: Runtime,
    shallow: bool,
    /// The value as written, unwrapped unless shallow.
    raw: RefCell<Value>,
    /// The value as read, deep-wrapped unless shallow.
    value: RefCell<Value>,
}

impl BoxedRef {
    fn new(runtime: &Runtime, value: Value, shallow: bool) -> Self {
        let (raw, value) = Self::convert(runtime, value, shallow);
        Self {
            id: ObjectId::next(),
            runtime: runtime.clone(),
            shallow,
            raw: RefCell::new(raw),
            value: RefCell::new(value),
        }
    }

    fn convert(runtime: &Runtime, value: Value, shallow: bool) -> (Value, Value) {
        if shallow {
            (value.clone(), value)
        } else {
            let raw = value.to_raw();
            let wrapped = runtime.to_reactive(raw.clone());
            (raw, wrapped)
        }
    }
}

impl RefSource for BoxedRef {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> RefKind {
        if self.shallow {
            RefKind::Shallow
        } else {
            RefKind::Plain
        }
    }

    fn get(&self) -> Value {
        track_ref_value(&self.runtime, self.id);
        self.value.borrow().clone()
    }

    fn get_untracked(&self) -> Value {
        self.value.borrow().clone()
    }

    fn set(&self, value: Value) -> Result<()> {
        let (raw, value) = Self::convert(&self.runtime, value, self.shallow);
        if !has_changed(&raw, &self.raw.borrow()) {
            return Ok(());
        }
        *self.raw.borrow_mut() = raw;
        *self.value.borrow_mut() = value;
        trigger_ref_value(&self.runtime, self.id);
        Ok(())
    }

    fn trigger(&self) {
        trigger_ref_value(&self.runtime, self.id);
    }
}

impl Runtime {
    /// Box a value in a ref. Targets stored in it come back wrapped.
    ///
    /// Passing a ref returns that same ref.
    pub fn ref_value(&self, value: impl Into<Value>) -> Ref {
        match value.into() {
            Value::Ref(r) => r,
            value => Ref::from_source(Rc::new(BoxedRef::new(self, value, false))),
        }
    }

    /// Box a value as-is: only replacing the whole value notifies.
    pub fn shallow_ref(&self, value: impl Into<Value>) -> Ref {
        match value.into() {
            Value::Ref(r) => r,
            value => Ref::from_source(Rc::new(BoxedRef::new(self, value, true))),
        }
    }
}

/// Whether the value is a ref.
pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// Whether the value is a computed ref.
pub fn is_computed(value: &Value) -> bool {
    matches!(value, Value::Ref(r) if r.kind() == RefKind::Computed)
}

/// The boxed value of a ref (tracked), or the value itself.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other.clone(),
    }
}

/// Notify every reader of `r` without changing its value.
pub fn trigger_ref(r: &Ref) {
    r.source.trigger();
}
