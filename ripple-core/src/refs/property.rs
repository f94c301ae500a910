//! Property refs and ref-unwrapping views.
//!
//! A property ref reads and writes one key of a target, so it can be passed
//! around on its own and still stay connected to the source. It records no
//! dependencies of its own: reading it through a wrapper tracks the wrapped
//! property.

use std::rc::Rc;

use indexmap::IndexMap;

use super::{is_ref, unref, Ref, RefKind, RefSource};
use crate::error::{ReactiveError, Result};
use crate::graph::{TrackKey, TriggerOp};
use crate::reactive::{Reactive, Runtime};
use crate::value::{Key, Object, ObjectId, PropKey, Value};

/// The target a property ref reads from.
#[derive(Clone)]
enum Source {
    Reactive(Reactive),
    Raw(Object),
}

impl Source {
    fn of(value: &Value) -> Result<Self> {
        match value {
            Value::Reactive(reactive) => Ok(Source::Reactive(reactive.clone())),
            Value::Object(object) => Ok(Source::Raw(object.clone())),
            other => Err(ReactiveError::NotATarget(other.type_name())),
        }
    }

    fn raw(&self) -> &Object {
        match self {
            Source::Reactive(reactive) => reactive.raw(),
            Source::Raw(object) => object,
        }
    }

    fn get(&self, key: &Value) -> Value {
        match self {
            Source::Reactive(reactive) => reactive.get(key.clone()),
            Source::Raw(object) => object.get(key.clone()),
        }
    }

    fn set(&self, key: &Value, value: Value) -> Result<()> {
        match self {
            Source::Reactive(reactive) => reactive.set(key.clone(), value),
            Source::Raw(object) => object.set(key.clone(), value),
        }
    }
}

struct PropertyRef {
    id: ObjectId,
    runtime: Runtime,
    source: Source,
    key: Value,
    fallback: Value,
}

impl RefSource for PropertyRef {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> RefKind {
        RefKind::Property
    }

    fn get(&self) -> Value {
        match self.source.get(&self.key) {
            Value::Undefined => self.fallback.clone(),
            value => value,
        }
    }

    fn get_untracked(&self) -> Value {
        self.runtime.untracked(|| self.get())
    }

    fn set(&self, value: Value) -> Result<()> {
        self.source.set(&self.key, value)
    }

    /// Notify readers of the underlying property.
    fn trigger(&self) {
        let raw = self.source.raw();
        let key = if raw.kind().is_collection() {
            TrackKey::Entry(Key::of(&self.key))
        } else {
            TrackKey::Prop(PropKey::from_value(&self.key))
        };
        let runtime = match &self.source {
            Source::Reactive(reactive) => reactive.runtime(),
            Source::Raw(_) => &self.runtime,
        };
        runtime.trigger(raw.id(), raw.kind(), TriggerOp::Set, Some(key), None);
    }
}

impl Runtime {
    /// A ref viewing `source[key]`.
    ///
    /// If the slot already holds a ref, that ref is returned.
    pub fn to_ref(&self, source: &Value, key: impl Into<Value>) -> Result<Ref> {
        self.to_ref_or(source, key, Value::Undefined)
    }

    /// Like [`to_ref`](Self::to_ref), reading `fallback` while the property
    /// is undefined.
    pub fn to_ref_or(
        &self,
        source: &Value,
        key: impl Into<Value>,
        fallback: impl Into<Value>,
    ) -> Result<Ref> {
        let source = Source::of(source)?;
        let key = key.into();
        if let Value::Ref(existing) = source.raw().get(key.clone()) {
            return Ok(existing);
        }
        Ok(Ref::from_source(Rc::new(PropertyRef {
            id: ObjectId::next(),
            runtime: self.clone(),
            source,
            key,
            fallback: fallback.into(),
        })))
    }

    /// A property ref for every key of a record or sequence.
    ///
    /// Warns if `source` is not a wrapper: refs over a raw target are never
    /// observed.
    pub fn to_refs(&self, source: &Value) -> Result<IndexMap<String, Ref>> {
        if !matches!(source, Value::Reactive(_)) {
            self.warn_misuse("to_refs() expects a reactive value");
        }
        let raw = Source::of(source)?.raw().clone();
        if raw.kind().is_collection() {
            return Err(ReactiveError::Unsupported {
                op: "to_refs",
                kind: raw.kind(),
            });
        }
        raw.keys()?
            .into_iter()
            .map(|key| {
                let name = PropKey::from_value(&key).to_string();
                self.to_ref(source, key).map(|r| (name, r))
            })
            .collect()
    }
}

/// A view over a record or sequence that unwraps refs on read and writes
/// through them on write.
#[derive(Debug, Clone)]
pub enum RefsProxy {
    /// Wrappers already unwrap refs, so they are used as they are.
    Reactive(Reactive),
    Shallow(Object),
}

impl RefsProxy {
    pub fn get(&self, key: impl Into<Value>) -> Value {
        match self {
            RefsProxy::Reactive(reactive) => reactive.get(key),
            RefsProxy::Shallow(object) => unref(&object.get(key)),
        }
    }

    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        match self {
            RefsProxy::Reactive(reactive) => reactive.set(key, value),
            RefsProxy::Shallow(object) => {
                let key = key.into();
                let value = value.into();
                if let Value::Ref(old) = object.get(key.clone()) {
                    if !is_ref(&value) {
                        return old.set(value);
                    }
                }
                object.set(key, value)
            }
        }
    }

    pub fn has(&self, key: impl Into<Value>) -> bool {
        match self {
            RefsProxy::Reactive(reactive) => reactive.has(key),
            RefsProxy::Shallow(object) => object.has(key),
        }
    }

    pub fn keys(&self) -> Result<Vec<Value>> {
        match self {
            RefsProxy::Reactive(reactive) => reactive.keys(),
            RefsProxy::Shallow(object) => object.keys(),
        }
    }
}

/// Ref-unwrapping view over a record or sequence. Returns `None` for any
/// other value.
pub fn proxy_refs(value: &Value) -> Option<RefsProxy> {
    match value {
        Value::Reactive(reactive) if !reactive.kind().is_collection() => {
            Some(RefsProxy::Reactive(reactive.clone()))
        }
        Value::Object(object) if !object.kind().is_collection() => {
            Some(RefsProxy::Shallow(object.clone()))
        }
        _ => None,
    }
}
