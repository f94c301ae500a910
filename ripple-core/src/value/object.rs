//! Raw Targets
//!
//! An [`Object`] is a shared handle to one mutable aggregate: a record, a
//! sequence, a map, a set, or a weak variant of either collection. Its
//! methods are the untracked primitives. They never record dependencies and
//! never notify anyone. Observation wrappers delegate to these primitives and
//! add the bookkeeping on top.
//!
//! Cloning an `Object` aliases the same target, so a mutation through one
//! handle (or through a wrapper) is visible through every other handle.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use super::{Key, ObjectId, PropKey, Value, WeakValue};
use crate::error::{ReactiveError, Result};

/// Largest length a sequence can be given, by index write or by `length`.
pub const MAX_SEQUENCE_LEN: usize = 1 << 24;

/// Shape of a target, which decides how a wrapper intercepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Insertion-ordered string-keyed fields.
    Record,
    /// Ordered, index-addressed elements with a `length`.
    Sequence,
    /// Insertion-ordered associative collection with unique keys.
    Map,
    /// Insertion-ordered collection of unique values.
    Set,
    /// Associative collection that does not keep its keys alive.
    WeakMap,
    /// Set that does not keep its members alive.
    WeakSet,
    /// A boxed value. Refs are tracked like targets but never wrapped.
    Ref,
}

impl TargetKind {
    pub fn is_sequence(self) -> bool {
        self == TargetKind::Sequence
    }

    /// Maps, weak or not.
    pub fn is_associative(self) -> bool {
        matches!(self, TargetKind::Map | TargetKind::WeakMap)
    }

    /// Collections go through the collection interception layer.
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            TargetKind::Map | TargetKind::Set | TargetKind::WeakMap | TargetKind::WeakSet
        )
    }

    pub fn is_weak(self) -> bool {
        matches!(self, TargetKind::WeakMap | TargetKind::WeakSet)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::Record => "record",
            TargetKind::Sequence => "sequence",
            TargetKind::Map => "map",
            TargetKind::Set => "set",
            TargetKind::WeakMap => "weak map",
            TargetKind::WeakSet => "weak set",
            TargetKind::Ref => "ref",
        })
    }
}

pub(crate) enum Target {
    Record(IndexMap<Rc<str>, Value>),
    /// `None` is a hole left by deleting an index.
    Sequence(Vec<Option<Value>>),
    /// Hash key -> (original key, value).
    Map(IndexMap<Key, (Value, Value)>),
    Set(IndexMap<Key, Value>),
    WeakMap(HashMap<ObjectId, (WeakValue, Value)>),
    WeakSet(HashMap<ObjectId, WeakValue>),
}

impl Target {
    fn kind(&self) -> TargetKind {
        match self {
            Target::Record(_) => TargetKind::Record,
            Target::Sequence(_) => TargetKind::Sequence,
            Target::Map(_) => TargetKind::Map,
            Target::Set(_) => TargetKind::Set,
            Target::WeakMap(_) => TargetKind::WeakMap,
            Target::WeakSet(_) => TargetKind::WeakSet,
        }
    }
}

pub(crate) struct ObjectCell {
    id: ObjectId,
    kind: TargetKind,
    /// Set by `mark_raw`; such targets are never wrapped.
    skip: Cell<bool>,
    target: RefCell<Target>,
}

/// Outcome of a property write.
#[derive(Debug)]
pub(crate) struct PropWrite {
    pub had_key: bool,
    pub old: Value,
}

/// Outcome of a collection write: the replaced value, if the key existed.
#[derive(Debug)]
pub(crate) struct EntryWrite {
    pub old: Option<Value>,
}

/// Shared handle to a raw target.
#[derive(Clone)]
pub struct Object {
    cell: Rc<ObjectCell>,
}

impl Object {
    fn new(target: Target) -> Self {
        Self {
            cell: Rc::new(ObjectCell {
                id: ObjectId::next(),
                kind: target.kind(),
                skip: Cell::new(false),
                target: RefCell::new(target),
            }),
        }
    }

    /// An empty record.
    pub fn record() -> Self {
        Self::new(Target::Record(IndexMap::new()))
    }

    /// A record with the given fields, in order.
    pub fn record_from<K, V, I>(fields: I) -> Self
    where
        K: Into<Rc<str>>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::new(Target::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// A sequence holding the given elements.
    pub fn sequence<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::new(Target::Sequence(
            items.into_iter().map(|item| Some(item.into())).collect(),
        ))
    }

    /// An empty map.
    pub fn map() -> Self {
        Self::new(Target::Map(IndexMap::new()))
    }

    /// A map with the given entries. Later duplicates overwrite earlier ones.
    pub fn map_from<K, V, I>(entries: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = IndexMap::new();
        for (k, v) in entries {
            let k = k.into();
            map.insert(Key::of(&k), (k, v.into()));
        }
        Self::new(Target::Map(map))
    }

    /// An empty set.
    pub fn empty_set() -> Self {
        Self::new(Target::Set(IndexMap::new()))
    }

    /// A set holding the given values.
    pub fn set_from<V, I>(values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let mut set = IndexMap::new();
        for v in values {
            let v = v.into();
            set.entry(Key::of(&v)).or_insert(v);
        }
        Self::new(Target::Set(set))
    }

    /// An empty weak map.
    pub fn weak_map() -> Self {
        Self::new(Target::WeakMap(HashMap::new()))
    }

    /// An empty weak set.
    pub fn weak_set() -> Self {
        Self::new(Target::WeakSet(HashMap::new()))
    }

    pub fn id(&self) -> ObjectId {
        self.cell.id
    }

    pub fn kind(&self) -> TargetKind {
        self.cell.kind
    }

    /// Exclude this target from wrapping, permanently.
    pub fn mark_raw(&self) -> &Self {
        self.cell.skip.set(true);
        self
    }

    pub fn is_marked_raw(&self) -> bool {
        self.cell.skip.get()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn downgrade(&self) -> WeakObject {
        WeakObject(Rc::downgrade(&self.cell))
    }

    fn unsupported(&self, op: &'static str) -> ReactiveError {
        ReactiveError::Unsupported {
            op,
            kind: self.kind(),
        }
    }

    // ------------------------------------------------------------------
    // Public untracked API
    // ------------------------------------------------------------------

    /// Read a property (records, sequences) or an entry (maps).
    pub fn get(&self, key: impl Into<Value>) -> Value {
        let key = key.into();
        if self.kind().is_collection() {
            self.entry_get(&key).unwrap_or_default()
        } else {
            self.read_prop(&PropKey::from_value(&key))
        }
    }

    /// Write a property (records, sequences) or an entry (maps).
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if self.kind().is_collection() {
            self.entry_set(key, value.into()).map(|_| ())
        } else {
            self.write_prop(&PropKey::from_value(&key), value.into())
                .map(|_| ())
        }
    }

    /// Delete a property or entry. Returns whether it existed.
    pub fn delete(&self, key: impl Into<Value>) -> Result<bool> {
        let key = key.into();
        if self.kind().is_collection() {
            Ok(self.entry_delete(&Key::of(&key)).is_some())
        } else {
            self.delete_prop(&PropKey::from_value(&key))
                .map(|old| old.is_some())
        }
    }

    pub fn has(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        if self.kind().is_collection() {
            self.entry_has(&Key::of(&key))
        } else {
            self.has_prop(&PropKey::from_value(&key))
        }
    }

    /// Record field names, sequence indices, map keys or set members.
    pub fn keys(&self) -> Result<Vec<Value>> {
        match &*self.cell.target.borrow() {
            Target::Record(fields) => Ok(fields.keys().map(|k| Value::Str(k.clone())).collect()),
            Target::Sequence(items) => Ok(items
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_some())
                .map(|(index, _)| Value::from(index))
                .collect()),
            Target::Map(map) => Ok(map.values().map(|(k, _)| k.clone()).collect()),
            Target::Set(set) => Ok(set.values().cloned().collect()),
            Target::WeakMap(_) | Target::WeakSet(_) => Err(self.unsupported("keys")),
        }
    }

    /// Length of a sequence.
    pub fn len(&self) -> Result<usize> {
        self.sequence_len().ok_or_else(|| self.unsupported("len"))
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Number of entries in a map or set.
    pub fn size(&self) -> Result<usize> {
        self.entry_count().ok_or_else(|| self.unsupported("size"))
    }

    /// Insert a member into a set. Returns whether it was newly added.
    pub fn add(&self, value: impl Into<Value>) -> Result<bool> {
        self.entry_add(value.into())
    }

    /// Remove every entry of a map or set. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        self.entry_clear()
    }

    /// Map entries as `(key, value)` pairs; set members as `(value, value)`.
    pub fn entries(&self) -> Result<Vec<(Value, Value)>> {
        self.entry_pairs().ok_or_else(|| self.unsupported("entries"))
    }

    /// Snapshot of a sequence's elements. Holes read as `Undefined`.
    pub fn to_vec(&self) -> Result<Vec<Value>> {
        match &*self.cell.target.borrow() {
            Target::Sequence(items) => Ok(items
                .iter()
                .map(|slot| slot.clone().unwrap_or_default())
                .collect()),
            _ => Err(self.unsupported("to_vec")),
        }
    }

    // ------------------------------------------------------------------
    // Record / sequence primitives
    // ------------------------------------------------------------------

    pub(crate) fn read_prop(&self, key: &PropKey) -> Value {
        match &*self.cell.target.borrow() {
            Target::Record(fields) => fields.get(&*key.to_name()).cloned().unwrap_or_default(),
            Target::Sequence(items) => match key {
                PropKey::Index(index) => items.get(*index).cloned().flatten().unwrap_or_default(),
                name if name.is_length() => Value::from(items.len()),
                PropKey::Name(_) => Value::Undefined,
            },
            _ => Value::Undefined,
        }
    }

    pub(crate) fn has_prop(&self, key: &PropKey) -> bool {
        match &*self.cell.target.borrow() {
            Target::Record(fields) => fields.contains_key(&*key.to_name()),
            Target::Sequence(items) => match key {
                PropKey::Index(index) => items.get(*index).is_some_and(Option::is_some),
                name => name.is_length(),
            },
            _ => false,
        }
    }

    pub(crate) fn write_prop(&self, key: &PropKey, value: Value) -> Result<PropWrite> {
        let kind = self.kind();
        match &mut *self.cell.target.borrow_mut() {
            Target::Record(fields) => {
                let old = fields.insert(key.to_name(), value);
                Ok(PropWrite {
                    had_key: old.is_some(),
                    old: old.unwrap_or_default(),
                })
            }
            Target::Sequence(items) => match key {
                PropKey::Index(index) => {
                    let had_key = *index < items.len();
                    if !had_key {
                        if *index >= MAX_SEQUENCE_LEN {
                            return Err(ReactiveError::InvalidLength(*index as f64 + 1.0));
                        }
                        items.resize(*index + 1, None);
                    }
                    let old = items[*index].replace(value).unwrap_or_default();
                    Ok(PropWrite { had_key, old })
                }
                name if name.is_length() => {
                    let new_len = match value {
                        Value::Number(n)
                            if n >= 0.0 && n.fract() == 0.0 && n <= MAX_SEQUENCE_LEN as f64 =>
                        {
                            n as usize
                        }
                        Value::Number(n) => return Err(ReactiveError::InvalidLength(n)),
                        _ => return Err(ReactiveError::InvalidLength(f64::NAN)),
                    };
                    let old = Value::from(items.len());
                    items.resize(new_len, None);
                    Ok(PropWrite { had_key: true, old })
                }
                PropKey::Name(name) => Err(ReactiveError::InvalidKey {
                    key: name.to_string(),
                }),
            },
            _ => Err(ReactiveError::Unsupported {
                op: "set property",
                kind,
            }),
        }
    }

    /// Delete a property, returning the old value if it existed.
    pub(crate) fn delete_prop(&self, key: &PropKey) -> Result<Option<Value>> {
        let kind = self.kind();
        match &mut *self.cell.target.borrow_mut() {
            Target::Record(fields) => Ok(fields.shift_remove(&*key.to_name())),
            Target::Sequence(items) => match key {
                PropKey::Index(index) => Ok(items.get_mut(*index).and_then(Option::take)),
                name if name.is_length() => {
                    Err(ReactiveError::NonConfigurable(PropKey::LENGTH.to_string()))
                }
                PropKey::Name(_) => Ok(None),
            },
            _ => Err(ReactiveError::Unsupported {
                op: "delete property",
                kind,
            }),
        }
    }

    pub(crate) fn prop_keys(&self) -> Vec<Value> {
        self.keys().unwrap_or_default()
    }

    pub(crate) fn sequence_len(&self) -> Option<usize> {
        match &*self.cell.target.borrow() {
            Target::Sequence(items) => Some(items.len()),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Collection primitives
    // ------------------------------------------------------------------

    pub(crate) fn entry_has(&self, key: &Key) -> bool {
        match &*self.cell.target.borrow() {
            Target::Map(map) => map.contains_key(key),
            Target::Set(set) => set.contains_key(key),
            Target::WeakMap(map) => key
                .identity()
                .and_then(|id| map.get(&id))
                .is_some_and(|(weak, _)| weak.is_alive()),
            Target::WeakSet(set) => key
                .identity()
                .and_then(|id| set.get(&id))
                .is_some_and(WeakValue::is_alive),
            _ => false,
        }
    }

    pub(crate) fn entry_get(&self, key: &Value) -> Option<Value> {
        let key = Key::of(key);
        match &*self.cell.target.borrow() {
            Target::Map(map) => map.get(&key).map(|(_, v)| v.clone()),
            Target::WeakMap(map) => key
                .identity()
                .and_then(|id| map.get(&id))
                .filter(|(weak, _)| weak.is_alive())
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    /// Insert or overwrite a map entry.
    pub(crate) fn entry_set(&self, key: Value, value: Value) -> Result<EntryWrite> {
        let kind = self.kind();
        let hash = Key::of(&key);
        match &mut *self.cell.target.borrow_mut() {
            Target::Map(map) => match map.get_mut(&hash) {
                Some(slot) => Ok(EntryWrite {
                    old: Some(std::mem::replace(&mut slot.1, value)),
                }),
                None => {
                    map.insert(hash, (key, value));
                    Ok(EntryWrite { old: None })
                }
            },
            Target::WeakMap(map) => {
                let (id, weak) = weak_key(&key)?;
                map.retain(|_, (weak, _)| weak.is_alive());
                let old = map.insert(id, (weak, value)).map(|(_, v)| v);
                Ok(EntryWrite { old })
            }
            _ => Err(ReactiveError::Unsupported { op: "set", kind }),
        }
    }

    /// Insert a set member. Returns whether it was newly added.
    pub(crate) fn entry_add(&self, value: Value) -> Result<bool> {
        let kind = self.kind();
        match &mut *self.cell.target.borrow_mut() {
            Target::Set(set) => {
                let hash = Key::of(&value);
                if set.contains_key(&hash) {
                    return Ok(false);
                }
                set.insert(hash, value);
                Ok(true)
            }
            Target::WeakSet(set) => {
                let (id, weak) = weak_key(&value)?;
                set.retain(|_, weak| weak.is_alive());
                Ok(set.insert(id, weak).is_none())
            }
            _ => Err(ReactiveError::Unsupported { op: "add", kind }),
        }
    }

    /// Remove an entry, returning its stored key and value.
    pub(crate) fn entry_delete(&self, key: &Key) -> Option<(Value, Value)> {
        match &mut *self.cell.target.borrow_mut() {
            Target::Map(map) => map.shift_remove(key),
            Target::Set(set) => set.shift_remove(key).map(|v| (v.clone(), v)),
            Target::WeakMap(map) => {
                let (weak, value) = map.remove(&key.identity()?)?;
                Some((weak.upgrade()?, value))
            }
            Target::WeakSet(set) => {
                let weak = set.remove(&key.identity()?)?;
                let value = weak.upgrade()?;
                Some((value.clone(), value))
            }
            _ => None,
        }
    }

    pub(crate) fn entry_clear(&self) -> Result<usize> {
        let kind = self.kind();
        match &mut *self.cell.target.borrow_mut() {
            Target::Map(map) => {
                let count = map.len();
                map.clear();
                Ok(count)
            }
            Target::Set(set) => {
                let count = set.len();
                set.clear();
                Ok(count)
            }
            _ => Err(ReactiveError::Unsupported { op: "clear", kind }),
        }
    }

    pub(crate) fn entry_count(&self) -> Option<usize> {
        match &*self.cell.target.borrow() {
            Target::Map(map) => Some(map.len()),
            Target::Set(set) => Some(set.len()),
            _ => None,
        }
    }

    pub(crate) fn entry_pairs(&self) -> Option<Vec<(Value, Value)>> {
        match &*self.cell.target.borrow() {
            Target::Map(map) => Some(map.values().cloned().collect()),
            Target::Set(set) => Some(set.values().map(|v| (v.clone(), v.clone())).collect()),
            _ => None,
        }
    }
}

fn weak_key(key: &Value) -> Result<(ObjectId, WeakValue)> {
    match (key.identity(), key.downgrade()) {
        (Some(id), Some(weak)) => Ok((id, weak)),
        _ => Err(ReactiveError::InvalidWeakKey),
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({} {})", self.kind(), self.id())
    }
}

thread_local! {
    /// Targets being serialized on this thread, outermost first.
    static SERIALIZING: RefCell<HashSet<ObjectId>> = RefCell::new(HashSet::new());
}

/// Marks a target as being serialized until dropped.
struct SerializeGuard(ObjectId);

impl SerializeGuard {
    /// `None` if the target is already being serialized further up.
    fn enter(id: ObjectId) -> Option<Self> {
        SERIALIZING
            .with(|active| active.borrow_mut().insert(id))
            .then_some(SerializeGuard(id))
    }
}

impl Drop for SerializeGuard {
    fn drop(&mut self) {
        SERIALIZING.with(|active| active.borrow_mut().remove(&self.0));
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let Some(_guard) = SerializeGuard::enter(self.id()) else {
            return Err(S::Error::custom(format!("cyclic target {}", self.id())));
        };
        match &*self.cell.target.borrow() {
            Target::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(&**k, v)?;
                }
                map.end()
            }
            Target::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item.as_ref().unwrap_or(&Value::Undefined))?;
                }
                seq.end()
            }
            Target::Map(map) => {
                let mut seq = serializer.serialize_seq(Some(map.len()))?;
                for (k, v) in map.values() {
                    seq.serialize_element(&(k, v))?;
                }
                seq.end()
            }
            Target::Set(set) => {
                let mut seq = serializer.serialize_seq(Some(set.len()))?;
                for v in set.values() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Target::WeakMap(_) | Target::WeakSet(_) => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

/// Non-owning handle to a raw target.
#[derive(Clone)]
pub(crate) struct WeakObject(Weak<ObjectCell>);

impl WeakObject {
    pub(crate) fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(|cell| Object { cell })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_preserves_insertion_order() {
        let record = Object::record_from([("b", 1), ("a", 2)]);
        record.set("c", 3).unwrap();
        assert_eq!(
            record.keys().unwrap(),
            vec![Value::from("b"), Value::from("a"), Value::from("c")]
        );
        assert!(record.delete("a").unwrap());
        assert!(!record.delete("a").unwrap());
        assert_eq!(record.keys().unwrap().len(), 2);
    }

    #[test]
    fn sequence_write_past_end_pads() {
        let seq = Object::sequence([0]);
        let write = seq.write_prop(&PropKey::Index(3), Value::from(1)).unwrap();
        assert!(!write.had_key);
        assert_eq!(seq.len().unwrap(), 4);
        assert_eq!(seq.get(1), Value::Undefined);
        assert_eq!(seq.get("length"), Value::from(4));
    }

    #[test]
    fn sequence_length_truncates_and_rejects_garbage() {
        let seq = Object::sequence([1, 2, 3]);
        seq.set("length", 1).unwrap();
        assert_eq!(seq.to_vec().unwrap(), vec![Value::from(1)]);
        assert_eq!(
            seq.set("length", -1),
            Err(ReactiveError::InvalidLength(-1.0))
        );
        assert!(matches!(
            seq.set("foo", 1),
            Err(ReactiveError::InvalidKey { .. })
        ));
    }

    #[test]
    fn deleting_sequence_length_is_rejected() {
        let seq = Object::sequence([1]);
        assert_eq!(
            seq.delete("length"),
            Err(ReactiveError::NonConfigurable("length".into()))
        );
        assert!(seq.delete(0).unwrap());
        assert_eq!(seq.len().unwrap(), 1);
        assert_eq!(seq.get(0), Value::Undefined);
    }

    #[test]
    fn deleted_indices_are_holes() {
        let seq = Object::sequence([1, 2, 3]);
        assert!(seq.delete(1).unwrap());
        assert!(!seq.delete(1).unwrap());
        assert!(!seq.has(1));
        assert!(seq.has(2));
        assert_eq!(seq.keys().unwrap(), vec![Value::from(0), Value::from(2)]);
        assert_eq!(
            seq.to_vec().unwrap(),
            vec![Value::from(1), Value::Undefined, Value::from(3)]
        );

        // Writing fills the hole; the length never changed, so it is a set.
        let write = seq.write_prop(&PropKey::Index(1), Value::from(5)).unwrap();
        assert!(write.had_key);
        assert!(seq.has(1));

        // Growing the length leaves holes, not undefined elements.
        seq.set("length", 5).unwrap();
        assert!(!seq.has(4));
        assert_eq!(seq.get(4), Value::Undefined);
    }

    #[test]
    fn sequence_length_is_bounded() {
        let seq = Object::sequence([1]);
        assert_eq!(
            seq.set("length", 4_294_967_295u32),
            Err(ReactiveError::InvalidLength(4_294_967_295.0))
        );
        assert_eq!(
            seq.set(MAX_SEQUENCE_LEN, 1),
            Err(ReactiveError::InvalidLength(MAX_SEQUENCE_LEN as f64 + 1.0))
        );
        assert_eq!(seq.len().unwrap(), 1);

        seq.set("length", MAX_SEQUENCE_LEN / 1024).unwrap();
        assert_eq!(seq.len().unwrap(), MAX_SEQUENCE_LEN / 1024);
    }

    #[test]
    fn serializing_a_cycle_fails() {
        let record = Object::record_from([("a", 1)]);
        let list = Object::sequence([Value::Object(record.clone())]);
        record.set("list", list.clone()).unwrap();

        let err = serde_json::to_string(&record).unwrap_err();
        assert!(err.to_string().contains("cyclic target"));

        let me = Object::record();
        me.set("me", me.clone()).unwrap();
        assert!(serde_json::to_string(&me).is_err());
        me.delete("me").unwrap();

        // Shared, acyclic children serialize every time they appear.
        let shared = Object::sequence([1]);
        let parent = Object::record_from([
            ("x", Value::Object(shared.clone())),
            ("y", Value::Object(shared)),
        ]);
        assert_eq!(
            serde_json::to_string(&parent).unwrap(),
            r#"{"x":[1],"y":[1]}"#
        );
        // The failed attempt left nothing behind.
        record.delete("list").unwrap();
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn map_keys_use_same_value_zero() {
        let map = Object::map();
        map.set(f64::NAN, "nan").unwrap();
        map.set(-0.0, "zero").unwrap();
        assert_eq!(map.get(f64::NAN), Value::from("nan"));
        assert_eq!(map.get(0.0), Value::from("zero"));
        assert_eq!(map.size().unwrap(), 2);
    }

    #[test]
    fn set_ignores_duplicates() {
        let set = Object::set_from([1, 2, 2]);
        assert_eq!(set.size().unwrap(), 2);
        assert!(!set.add(1).unwrap());
        assert!(set.add(3).unwrap());
        assert_eq!(set.clear().unwrap(), 3);
    }

    #[test]
    fn weak_map_requires_object_keys_and_forgets_dropped_ones() {
        let weak = Object::weak_map();
        assert_eq!(weak.set("k", 1), Err(ReactiveError::InvalidWeakKey));

        let key = Object::record();
        weak.set(key.clone(), 1).unwrap();
        assert!(weak.has(key.clone()));
        assert_eq!(weak.get(key.clone()), Value::from(1));

        let other = Object::record();
        weak.set(other.clone(), 2).unwrap();
        drop(other);
        // Dead entries are pruned on the next write.
        weak.set(key.clone(), 3).unwrap();
        assert!(matches!(
            &*weak.cell.target.borrow(),
            Target::WeakMap(map) if map.len() == 1
        ));
        assert!(weak.size().is_err());
    }

    #[test]
    fn shape_specific_operations_fail_on_wrong_shape() {
        let record = Object::record();
        assert!(matches!(
            record.add(1),
            Err(ReactiveError::Unsupported { op: "add", .. })
        ));
        assert!(record.len().is_err());
        assert!(Object::map().set("a", 1).is_ok());
        assert!(Object::empty_set().set("a", 1).is_err());
    }
}
