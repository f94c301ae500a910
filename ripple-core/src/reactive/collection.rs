//! Map and Set Handlers
//!
//! Collections store raw keys and raw values only. A caller may look an
//! entry up with either a wrapped or a raw object: the exact key is tried
//! first, then its raw form.
//!
//! Iteration depends on the enumeration key, except `keys()` on a map which
//! depends only on the map's key set, so overwriting a value does not
//! invalidate an effect that only listed the keys.
//!
//! Weak collections support lookups and writes but have no size, no
//! iteration and no `clear`.

use super::wrapper::Reactive;
use crate::error::{ReactiveError, Result};
use crate::graph::{TrackKey, TrackOp, TriggerOp};
use crate::value::{has_changed, Key, Value};

/// One item yielded by [`Reactive::iter`].
#[derive(Debug, Clone, PartialEq)]
pub enum IterItem {
    /// A set member.
    Single(Value),
    /// A map entry.
    Pair(Value, Value),
}

impl Reactive {
    fn unsupported(&self, op: &'static str) -> ReactiveError {
        ReactiveError::Unsupported {
            op,
            kind: self.kind(),
        }
    }

    fn track_entry(&self, op: TrackOp, key: &Value) {
        self.runtime()
            .track(self.target_id(), op, TrackKey::Entry(Key::of(key)));
    }

    /// Track both the key as given and its raw form.
    fn track_lookup(&self, op: TrackOp, key: &Value) {
        let raw_key = key.to_raw();
        if !raw_key.same_value_zero(key) {
            self.track_entry(op, key);
        }
        self.track_entry(op, &raw_key);
    }

    fn track_iterate(&self, key: TrackKey) {
        self.runtime()
            .track(self.target_id(), TrackOp::Iterate, key);
    }

    fn trigger_entry(&self, op: TriggerOp, key: Option<&Value>) {
        self.runtime().trigger(
            self.target_id(),
            self.kind(),
            op,
            key.map(|k| TrackKey::Entry(Key::of(k))),
            None,
        );
    }

    /// The key as stored: the exact key if present, otherwise its raw form.
    fn resolve_key(&self, key: &Value) -> (Value, bool) {
        if self.raw().entry_has(&Key::of(key)) {
            return (key.clone(), true);
        }
        let raw_key = key.to_raw();
        let present = self.raw().entry_has(&Key::of(&raw_key));
        (raw_key, present)
    }

    pub(crate) fn entry_get(&self, key: &Value) -> Value {
        if !self.kind().is_associative() {
            return Value::Undefined;
        }
        self.track_lookup(TrackOp::Get, key);
        let (key, _) = self.resolve_key(key);
        let value = self.raw().entry_get(&key).unwrap_or_default();
        self.runtime().to_reactive(value)
    }

    pub(crate) fn entry_has(&self, key: &Value) -> bool {
        self.track_lookup(TrackOp::Has, key);
        self.resolve_key(key).1
    }

    pub(crate) fn entry_set(&self, key: Value, value: Value) -> Result<()> {
        let value = value.to_raw();
        let (key, _) = self.resolve_key(&key);
        let write = self.raw().entry_set(key.clone(), value.clone())?;

        match write.old {
            None => self.trigger_entry(TriggerOp::Add, Some(&key)),
            Some(old) if has_changed(&value, &old) => {
                self.trigger_entry(TriggerOp::Set, Some(&key))
            }
            Some(_) => {}
        }
        Ok(())
    }

    pub(crate) fn entry_delete(&self, key: &Value) -> bool {
        let (key, present) = self.resolve_key(key);
        if !present {
            return false;
        }
        self.raw().entry_delete(&Key::of(&key));
        self.trigger_entry(TriggerOp::Delete, Some(&key));
        true
    }

    pub(crate) fn entry_keys(&self) -> Result<Vec<Value>> {
        if self.kind().is_weak() {
            return Err(self.unsupported("keys"));
        }
        self.track_iterate(if self.kind().is_associative() {
            TrackKey::MapKeyIterate
        } else {
            TrackKey::Iterate
        });
        let keys = self.raw().keys()?;
        Ok(self.wrap_all(keys))
    }

    fn wrap_all(&self, values: Vec<Value>) -> Vec<Value> {
        let runtime = self.runtime();
        values.into_iter().map(|v| runtime.to_reactive(v)).collect()
    }

    /// Raw entry pairs after tracking the enumeration key.
    fn iterate_pairs(&self, op: &'static str) -> Result<Vec<(Value, Value)>> {
        if self.kind().is_weak() {
            return Err(self.unsupported(op));
        }
        let pairs = self
            .raw()
            .entry_pairs()
            .ok_or_else(|| self.unsupported(op))?;
        self.track_iterate(TrackKey::Iterate);
        Ok(pairs)
    }

    // ------------------------------------------------------------------
    // Public collection API
    // ------------------------------------------------------------------

    /// Number of entries. Tracks the enumeration key.
    pub fn size(&self) -> Result<usize> {
        if self.kind().is_weak() {
            return Err(self.unsupported("size"));
        }
        let size = self.raw().entry_count().ok_or_else(|| self.unsupported("size"))?;
        self.track_iterate(TrackKey::Iterate);
        Ok(size)
    }

    /// Insert a set member. Notifies only if it was not already present.
    pub fn add(&self, value: impl Into<Value>) -> Result<bool> {
        let value = value.into().to_raw();
        let added = self.raw().entry_add(value.clone())?;
        if added {
            self.trigger_entry(TriggerOp::Add, Some(&value));
        }
        Ok(added)
    }

    /// Remove every entry. Notifies only if there was something to remove.
    pub fn clear(&self) -> Result<usize> {
        if self.kind().is_weak() || !self.kind().is_collection() {
            return Err(self.unsupported("clear"));
        }
        let removed = self.raw().entry_clear()?;
        if removed > 0 {
            self.trigger_entry(TriggerOp::Clear, None);
        }
        Ok(removed)
    }

    /// Visit every entry as `(value, key)`, both wrapped. Set members are
    /// passed as both value and key.
    pub fn for_each(&self, mut f: impl FnMut(Value, Value)) -> Result<()> {
        let runtime = self.runtime();
        for (key, value) in self.iterate_pairs("for_each")? {
            f(runtime.to_reactive(value), runtime.to_reactive(key));
        }
        Ok(())
    }

    /// Map values or set members, wrapped.
    pub fn values(&self) -> Result<Vec<Value>> {
        let pairs = self.iterate_pairs("values")?;
        Ok(self.wrap_all(pairs.into_iter().map(|(_, v)| v).collect()))
    }

    /// `(key, value)` pairs with both halves wrapped. Set members are
    /// yielded as `(member, member)`.
    pub fn entries(&self) -> Result<Vec<(Value, Value)>> {
        let runtime = self.runtime();
        Ok(self
            .iterate_pairs("entries")?
            .into_iter()
            .map(|(k, v)| (runtime.to_reactive(k), runtime.to_reactive(v)))
            .collect())
    }

    /// Default iteration: entries for maps, members for sets.
    pub fn iter(&self) -> Result<Vec<IterItem>> {
        if self.kind().is_associative() {
            Ok(self
                .entries()?
                .into_iter()
                .map(|(k, v)| IterItem::Pair(k, v))
                .collect())
        } else {
            Ok(self.values()?.into_iter().map(IterItem::Single).collect())
        }
    }
}
