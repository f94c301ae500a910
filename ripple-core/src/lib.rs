//! Ripple Core
//!
//! This crate provides a fine-grained reactive dependency-tracking engine.
//! It implements:
//!
//! - Observation wrappers over records, sequences, maps and sets
//! - Effects that re-run when what they read changes
//! - Refs, computed values and derived refs
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: dynamic values and the raw targets they point to
//! - `graph`: the dependency graph between observed keys and effects
//! - `reactive`: wrappers, effects and the runtime that connects them
//! - `refs`: boxed values, computed values and property refs
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use ripple_core::{computed, effect, reactive, Value};
//! use serde_json::json;
//!
//! let state = reactive(json!({ "count": 1 }));
//! let state = state.as_reactive().unwrap().clone();
//!
//! let s = state.clone();
//! let doubled = computed(move || s.get("count").as_f64().unwrap_or_default() * 2.0);
//!
//! let seen = Rc::new(Cell::new(0.0));
//! let (d, out) = (doubled.clone(), seen.clone());
//! let _effect = effect(move || out.set(d.get().as_f64().unwrap_or_default()));
//! assert_eq!(seen.get(), 2.0);
//!
//! state.set("count", 5).unwrap();
//! assert_eq!(seen.get(), 10.0);
//! ```
//!
//! The free functions use the calling thread's default [`Runtime`]. Create
//! a [`Runtime`] explicitly to get an engine that shares nothing with it.

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod refs;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use reactive::{
    is_reactive, to_raw, DebugOp, DebuggerEvent, Effect, EffectId, EffectOptions, IterItem,
    Reactive, Runtime,
};
pub use refs::{
    is_computed, is_ref, proxy_refs, trigger_ref, unref, Ref, RefKind, RefTracker, RefsProxy,
};
pub use value::{
    has_changed, Key, Object, ObjectId, PropKey, TargetKind, Value, MAX_SEQUENCE_LEN,
};

use indexmap::IndexMap;

/// Wrap a target for observation in the default runtime.
///
/// Wrappers pass through; values that cannot be wrapped are returned as
/// they are.
pub fn reactive(value: impl Into<Value>) -> Value {
    Runtime::current().reactive(value)
}

/// Exclude a target from wrapping, permanently.
pub fn mark_raw(object: &Object) -> &Object {
    object.mark_raw()
}

/// Create an effect in the default runtime. It runs immediately.
pub fn effect<T, F>(func: F) -> Effect<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    Runtime::current().effect(func)
}

pub fn effect_with<T, F>(func: F, options: EffectOptions) -> Effect<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    Runtime::current().effect_with(func, options)
}

/// Detach an effect from everything it depends on.
pub fn stop<T>(effect: &Effect<T>) {
    effect.stop();
}

/// Box a value in a ref.
pub fn ref_value(value: impl Into<Value>) -> Ref {
    Runtime::current().ref_value(value)
}

pub fn shallow_ref(value: impl Into<Value>) -> Ref {
    Runtime::current().shallow_ref(value)
}

pub fn custom_ref<F, G, S>(factory: F) -> Ref
where
    F: FnOnce(RefTracker) -> (G, S),
    G: Fn() -> Value + 'static,
    S: Fn(Value) + 'static,
{
    Runtime::current().custom_ref(factory)
}

/// A read-only cached value.
pub fn computed<T, F>(getter: F) -> Ref
where
    T: Into<Value>,
    F: Fn() -> T + 'static,
{
    Runtime::current().computed(getter)
}

pub fn computed_with_setter<T, F, S>(getter: F, setter: S) -> Ref
where
    T: Into<Value>,
    F: Fn() -> T + 'static,
    S: Fn(Value) + 'static,
{
    Runtime::current().computed_with_setter(getter, setter)
}

/// A ref viewing one property of a target.
pub fn to_ref(source: &Value, key: impl Into<Value>) -> Result<Ref> {
    Runtime::current().to_ref(source, key)
}

pub fn to_ref_or(source: &Value, key: impl Into<Value>, fallback: impl Into<Value>) -> Result<Ref> {
    Runtime::current().to_ref_or(source, key, fallback)
}

/// A property ref for every key of a record or sequence.
pub fn to_refs(source: &Value) -> Result<IndexMap<String, Ref>> {
    Runtime::current().to_refs(source)
}
