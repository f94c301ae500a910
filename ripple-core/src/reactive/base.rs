//! Record and Sequence Handlers
//!
//! Reads track `(target, key)` and return nested targets wrapped, so deep
//! reactivity is applied lazily on access. Writes tell an `Add` from a `Set`
//! by whether the key existed before, and a `Set` only notifies when the
//! value actually changed.
//!
//! Refs stored in a record are unwrapped on read and written through on
//! write. Refs stored at a sequence index stay refs.
//!
//! # Sequence methods
//!
//! The search methods (`includes`, `index_of`, `last_index_of`) depend on
//! the whole sequence. The mutating methods (`push`, `pop`, `shift`,
//! `unshift`, `splice`) go through the wrapper's own accessors with tracking
//! paused, so their internal reads of `length` never become dependencies of
//! the calling effect.

use super::wrapper::Reactive;
use crate::error::{ReactiveError, Result};
use crate::graph::{TrackKey, TrackOp, TriggerOp};
use crate::value::{has_changed, PropKey, Value};

impl Reactive {
    fn track_prop(&self, op: TrackOp, key: &PropKey) {
        self.runtime()
            .track(self.target_id(), op, TrackKey::Prop(key.clone()));
    }

    fn trigger_prop(&self, op: TriggerOp, key: &PropKey, new_value: Option<&Value>) {
        self.runtime().trigger(
            self.target_id(),
            self.kind(),
            op,
            Some(TrackKey::Prop(key.clone())),
            new_value,
        );
    }

    pub(crate) fn prop_get(&self, key: &Value) -> Value {
        let key = PropKey::from_value(key);
        let value = self.raw().read_prop(&key);
        self.track_prop(TrackOp::Get, &key);

        match value {
            Value::Ref(r) if self.kind().is_sequence() && key.as_index().is_some() => Value::Ref(r),
            Value::Ref(r) => r.get(),
            other => self.runtime().to_reactive(other),
        }
    }

    pub(crate) fn prop_set(&self, key: &Value, value: Value) -> Result<()> {
        let key = PropKey::from_value(key);
        let value = value.to_raw();

        if !self.kind().is_sequence() {
            if let Value::Ref(old) = self.raw().read_prop(&key) {
                if !matches!(value, Value::Ref(_)) {
                    return old.set(value);
                }
            }
        }

        let write = self.raw().write_prop(&key, value.clone())?;
        if !write.had_key {
            self.trigger_prop(TriggerOp::Add, &key, Some(&value));
        } else if has_changed(&value, &write.old) {
            self.trigger_prop(TriggerOp::Set, &key, Some(&value));
        }
        Ok(())
    }

    pub(crate) fn prop_delete(&self, key: &Value) -> Result<bool> {
        let key = PropKey::from_value(key);
        match self.raw().delete_prop(&key)? {
            Some(_) => {
                self.trigger_prop(TriggerOp::Delete, &key, None);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn prop_has(&self, key: &Value) -> bool {
        let key = PropKey::from_value(key);
        self.track_prop(TrackOp::Has, &key);
        self.raw().has_prop(&key)
    }

    pub(crate) fn prop_keys(&self) -> Vec<Value> {
        let key = if self.kind().is_sequence() {
            TrackKey::length()
        } else {
            TrackKey::Iterate
        };
        self.runtime().track(self.target_id(), TrackOp::Iterate, key);
        self.raw().prop_keys()
    }

    // ------------------------------------------------------------------
    // Sequence reads
    // ------------------------------------------------------------------

    fn require_sequence(&self, op: &'static str) -> Result<usize> {
        self.raw()
            .sequence_len()
            .ok_or(ReactiveError::Unsupported {
                op,
                kind: self.kind(),
            })
    }

    /// Length of a sequence. Tracks `length`.
    pub fn len(&self) -> Result<usize> {
        let len = self.require_sequence("len")?;
        self.runtime()
            .track(self.target_id(), TrackOp::Get, TrackKey::length());
        Ok(len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Every element, read through the wrapper.
    pub fn to_vec(&self) -> Result<Vec<Value>> {
        let len = self.len()?;
        Ok((0..len).map(|i| self.prop_get(&Value::from(i))).collect())
    }

    /// Depend on the whole sequence: `length` plus every index.
    fn track_all_indices(&self, len: usize) {
        let runtime = self.runtime();
        let target = self.target_id();
        runtime.track(target, TrackOp::Get, TrackKey::length());
        for i in 0..len {
            runtime.track(target, TrackOp::Get, TrackKey::Prop(PropKey::Index(i)));
        }
    }

    /// Search wrapped elements for `needle`, then retry against the raw
    /// elements with the raw form of `needle`.
    fn search(
        &self,
        op: &'static str,
        needle: &Value,
        reverse: bool,
        eq: fn(&Value, &Value) -> bool,
    ) -> Result<Option<usize>> {
        let len = self.require_sequence(op)?;
        self.track_all_indices(len);

        let items = self.raw().to_vec()?;
        let runtime = self.runtime();
        let find = |matches: &dyn Fn(&Value) -> bool| {
            if reverse {
                items.iter().rposition(matches)
            } else {
                items.iter().position(matches)
            }
        };

        let found = find(&|item: &Value| eq(&runtime.to_reactive(item.clone()), needle));
        if found.is_some() {
            return Ok(found);
        }
        let raw_needle = needle.to_raw();
        Ok(find(&|item: &Value| eq(item, &raw_needle)))
    }

    /// SameValueZero membership test.
    pub fn includes(&self, needle: impl Into<Value>) -> Result<bool> {
        self.search("includes", &needle.into(), false, Value::same_value_zero)
            .map(|found| found.is_some())
    }

    /// Position of the first strictly equal element.
    pub fn index_of(&self, needle: impl Into<Value>) -> Result<Option<usize>> {
        self.search("index_of", &needle.into(), false, Value::strict_equals)
    }

    /// Position of the last strictly equal element.
    pub fn last_index_of(&self, needle: impl Into<Value>) -> Result<Option<usize>> {
        self.search("last_index_of", &needle.into(), true, Value::strict_equals)
    }

    // ------------------------------------------------------------------
    // Sequence mutations
    // ------------------------------------------------------------------

    /// Move the element at `from` to `to`, or clear `to` if `from` is a hole.
    fn shift_element(&self, from: usize, to: usize) -> Result<()> {
        let from = Value::from(from);
        if self.raw().has_prop(&PropKey::from_value(&from)) {
            let moved = self.prop_get(&from);
            self.prop_set(&Value::from(to), moved)
        } else {
            self.prop_delete(&Value::from(to)).map(drop)
        }
    }

    fn set_length(&self, len: usize) -> Result<()> {
        self.prop_set(&Value::from(PropKey::LENGTH), Value::from(len))
    }

    /// Append a value. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        let len = self.require_sequence("push")?;
        let value = value.into();
        self.runtime().untracked(|| {
            self.prop_set(&Value::from(len), value)?;
            self.set_length(len + 1)?;
            Ok(len + 1)
        })
    }

    /// Remove and return the last element (`Undefined` when empty).
    pub fn pop(&self) -> Result<Value> {
        let len = self.require_sequence("pop")?;
        self.runtime().untracked(|| {
            if len == 0 {
                self.set_length(0)?;
                return Ok(Value::Undefined);
            }
            let last = Value::from(len - 1);
            let element = self.prop_get(&last);
            self.prop_delete(&last)?;
            self.set_length(len - 1)?;
            Ok(element)
        })
    }

    /// Remove and return the first element (`Undefined` when empty).
    pub fn shift(&self) -> Result<Value> {
        let len = self.require_sequence("shift")?;
        self.runtime().untracked(|| {
            if len == 0 {
                self.set_length(0)?;
                return Ok(Value::Undefined);
            }
            let first = self.prop_get(&Value::from(0));
            for k in 1..len {
                self.shift_element(k, k - 1)?;
            }
            self.prop_delete(&Value::from(len - 1))?;
            self.set_length(len - 1)?;
            Ok(first)
        })
    }

    /// Insert a value at the front. Returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> Result<usize> {
        let len = self.require_sequence("unshift")?;
        let value = value.into();
        self.runtime().untracked(|| {
            for k in (0..len).rev() {
                self.shift_element(k, k + 1)?;
            }
            self.prop_set(&Value::from(0), value)?;
            self.set_length(len + 1)?;
            Ok(len + 1)
        })
    }

    /// Remove `delete_count` elements at `start` and insert `items` in their
    /// place. Returns the removed elements.
    ///
    /// `start` and `delete_count` are clamped to the sequence.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    ) -> Result<Vec<Value>> {
        let len = self.require_sequence("splice")?;
        self.runtime().untracked(|| {
            let start = start.min(len);
            let delete_count = delete_count.min(len - start);
            let item_count = items.len();

            let removed = (start..start + delete_count)
                .map(|i| self.prop_get(&Value::from(i)))
                .collect();

            if item_count < delete_count {
                for k in start..len - delete_count {
                    self.shift_element(k + delete_count, k + item_count)?;
                }
                for k in (len - delete_count + item_count..len).rev() {
                    self.prop_delete(&Value::from(k))?;
                }
            } else if item_count > delete_count {
                for k in (start..len - delete_count).rev() {
                    self.shift_element(k + delete_count, k + item_count)?;
                }
            }

            for (offset, item) in items.into_iter().enumerate() {
                self.prop_set(&Value::from(start + offset), item)?;
            }
            self.set_length(len - delete_count + item_count)?;
            Ok(removed)
        })
    }
}
