//! Computed Refs
//!
//! A computed ref caches a derived value.
//!
//! # How Computed Refs Work
//!
//! 1. The getter runs inside a lazy effect, so nothing is computed until the
//!    first read.
//!
//! 2. When something the getter read changes, the effect's scheduler only
//!    marks the cache dirty and notifies the computed's own readers. The
//!    getter is not re-run.
//!
//! 3. The next read re-runs the getter exactly once and caches the result.
//!
//! Changing an input several times between reads costs a single
//! recomputation, and a computed nobody reads never recomputes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{track_ref_value, trigger_ref_value, Ref, RefKind, RefSource};
use crate::error::{ReactiveError, Result};
use crate::reactive::{Effect, EffectOptions, Runtime};
use crate::value::{ObjectId, Value};

struct ComputedRef {
    id: ObjectId,
    runtime: Runtime,
    effect: Effect<Value>,
    value: RefCell<Value>,
    dirty: Rc<Cell<bool>>,
    setter: Option<Box<dyn Fn(Value)>>,
}

impl RefSource for ComputedRef {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> RefKind {
        RefKind::Computed
    }

    fn get(&self) -> Value {
        if self.dirty.get() {
            // `None` means the getter is already running further up the
            // stack; keep the stale value and stay dirty.
            if let Some(value) = self.effect.run() {
                *self.value.borrow_mut() = value;
                self.dirty.set(false);
            }
        }
        track_ref_value(&self.runtime, self.id);
        self.value.borrow().clone()
    }

    fn get_untracked(&self) -> Value {
        self.runtime.untracked(|| self.get())
    }

    fn set(&self, value: Value) -> Result<()> {
        match &self.setter {
            Some(setter) => {
                setter(value);
                Ok(())
            }
            None => {
                self.runtime
                    .warn_misuse("write to a computed value that has no setter");
                Err(ReactiveError::ReadonlyComputed)
            }
        }
    }

    fn trigger(&self) {
        trigger_ref_value(&self.runtime, self.id);
    }
}

impl Runtime {
    /// A read-only cached value derived from `getter`.
    pub fn computed<T, F>(&self, getter: F) -> Ref
    where
        T: Into<Value>,
        F: Fn() -> T + 'static,
    {
        self.build_computed(move || getter().into(), None)
    }

    /// A cached value derived from `getter`; writes are passed to `setter`.
    pub fn computed_with_setter<T, F, S>(&self, getter: F, setter: S) -> Ref
    where
        T: Into<Value>,
        F: Fn() -> T + 'static,
        S: Fn(Value) + 'static,
    {
        self.build_computed(move || getter().into(), Some(Box::new(setter)))
    }

    fn build_computed(
        &self,
        getter: impl Fn() -> Value + 'static,
        setter: Option<Box<dyn Fn(Value)>>,
    ) -> Ref {
        let id = ObjectId::next();
        let dirty = Rc::new(Cell::new(true));

        let scheduler = {
            let runtime = self.clone();
            let dirty = dirty.clone();
            move || {
                if !dirty.replace(true) {
                    trigger_ref_value(&runtime, id);
                }
            }
        };

        let mut options = EffectOptions::new().lazy().scheduler(scheduler);
        options.computed = true;
        let effect = self.effect_with(getter, options);

        Ref::from_source(Rc::new(ComputedRef {
            id,
            runtime: self.clone(),
            effect,
            value: RefCell::new(Value::Undefined),
            dirty,
            setter,
        }))
    }
}
