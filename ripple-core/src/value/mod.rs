//! Value Model
//!
//! The engine works on dynamically shaped data. A [`Value`] is either a
//! primitive, a raw target ([`Object`]), an observation wrapper
//! ([`Reactive`]) or a boxed reactive value ([`Ref`]).
//!
//! # Identity
//!
//! Objects, wrappers and refs are reference types: cloning a handle aliases
//! the same underlying data, and equality compares identity. Every one of
//! them carries a process-unique [`ObjectId`].
//!
//! # Equality
//!
//! `PartialEq` for `Value` is SameValueZero: NaN equals NaN and +0 equals
//! -0. This is the comparison used to decide whether a write actually
//! changed anything. [`Value::strict_equals`] is the stricter comparison used
//! by `index_of`, where NaN is never equal to itself.

mod key;
mod object;

pub use key::{Key, PropKey};
pub use object::{Object, TargetKind, MAX_SEQUENCE_LEN};

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::ser::{Serialize, Serializer};

use crate::reactive::{Reactive, WeakReactive};
use crate::refs::{Ref, WeakRef};

pub(crate) use object::WeakObject;

/// Unique identifier for objects, wrappers and refs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique id.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    /// A raw, unobserved target.
    Object(Object),
    /// An observation wrapper around a target.
    Reactive(Reactive),
    /// A boxed reactive value.
    Ref(Ref),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `Undefined` or `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Value::Reactive(reactive) => Some(reactive),
            _ => None,
        }
    }

    pub fn as_ref_value(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// JavaScript-style truthiness, handy inside effect bodies.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Reactive(_) | Value::Ref(_) => true,
        }
    }

    /// Identity of reference values.
    pub fn identity(&self) -> Option<ObjectId> {
        match self {
            Value::Object(object) => Some(object.id()),
            Value::Reactive(reactive) => Some(reactive.id()),
            Value::Ref(r) => Some(r.id()),
            _ => None,
        }
    }

    /// Follow a wrapper back to its raw target. Other values are returned
    /// unchanged.
    pub fn to_raw(&self) -> Value {
        match self {
            Value::Reactive(reactive) => Value::Object(reactive.raw().clone()),
            other => other.clone(),
        }
    }

    /// SameValueZero comparison.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self.loose_identity_eq(other),
        }
    }

    /// Strict equality: like SameValueZero, except NaN never equals NaN.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.loose_identity_eq(other),
        }
    }

    fn loose_identity_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(_), Value::Object(_))
            | (Value::Reactive(_), Value::Reactive(_))
            | (Value::Ref(_), Value::Ref(_)) => self.identity() == other.identity(),
            _ => false,
        }
    }

    /// Short name of the value's type, used in log records.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Reactive(_) => "reactive",
            Value::Ref(_) => "ref",
        }
    }

    pub(crate) fn downgrade(&self) -> Option<WeakValue> {
        match self {
            Value::Object(object) => Some(WeakValue::Object(object.downgrade())),
            Value::Reactive(reactive) => Some(WeakValue::Reactive(reactive.downgrade())),
            Value::Ref(r) => Some(WeakValue::Ref(r.downgrade())),
            _ => None,
        }
    }
}

/// Whether a write from `old` to `new` counts as a change.
pub fn has_changed(new: &Value, old: &Value) -> bool {
    !new.same_value_zero(old)
}

/// Non-owning handle to a reference value, used by weak collections.
#[derive(Clone)]
pub(crate) enum WeakValue {
    Object(WeakObject),
    Reactive(WeakReactive),
    Ref(WeakRef),
}

impl WeakValue {
    pub(crate) fn upgrade(&self) -> Option<Value> {
        match self {
            WeakValue::Object(weak) => weak.upgrade().map(Value::Object),
            WeakValue::Reactive(weak) => weak.upgrade().map(Value::Reactive),
            WeakValue::Ref(weak) => weak.upgrade().map(Value::Ref),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        match self {
            WeakValue::Object(weak) => weak.is_alive(),
            WeakValue::Reactive(weak) => weak.is_alive(),
            WeakValue::Ref(weak) => weak.is_alive(),
        }
    }
}

/// Format a number the way property keys spell it.
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{n}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value_zero(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(object) => write!(f, "{object:?}"),
            Value::Reactive(reactive) => write!(f, "{reactive:?}"),
            Value::Ref(r) => write!(f, "{r:?}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Object(object) => object.serialize(serializer),
            Value::Reactive(reactive) => reactive.raw().serialize(serializer),
            Value::Ref(r) => r.get_untracked().serialize(serializer),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_int!(i32, i64, u32, u64, usize);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::Str(s)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Reactive> for Value {
    fn from(reactive: Reactive) -> Self {
        Value::Reactive(reactive)
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    /// Build raw targets from a JSON literal: objects become records and
    /// arrays become sequences.
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s.into()),
            serde_json::Value::Array(items) => {
                Value::Object(Object::sequence(items.into_iter().map(Value::from)))
            }
            serde_json::Value::Object(fields) => Value::Object(Object::record_from(
                fields.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
        }
    }
}
