//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects wrappers, refs and
//! effects. It owns:
//!
//! - the tracking context (active effect, pause/resume state),
//! - the dependency graph (target -> key -> dep, plus effect nodes),
//! - the wrapper registry (raw target -> its one observation wrapper).
//!
//! # How It Works
//!
//! 1. A read through a wrapper or ref calls [`Runtime::track`], which links
//!    the (target, key) pair to the active effect.
//!
//! 2. A write calls [`Runtime::trigger`], which asks the graph for the
//!    invalidated effects and notifies each of them synchronously, skipping
//!    the effect that is currently running.
//!
//! # Threading
//!
//! A runtime is single-threaded (`!Send`). Each thread gets its own default
//! runtime from [`Runtime::current`]; independent runtimes can be created
//! with [`Runtime::new`] and never observe each other.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::effect::{Effect, EffectOptions};
use super::subscriber::{DebugOp, DebuggerEvent, EffectId, Subscriber};
use super::wrapper::{Reactive, WeakReactive};
use super::context::TrackingContext;
use crate::config::RuntimeConfig;
use crate::graph::{DependencyGraph, TrackKey, TrackOp, TriggerOp};
use crate::value::{Object, ObjectId, TargetKind, Value};

thread_local! {
    static CURRENT: Runtime = Runtime::new();
}

/// Minimum wrapper-registry size before entries of dropped targets are
/// swept.
const WRAPPER_SWEEP_FLOOR: usize = 64;

struct RuntimeInner {
    config: RuntimeConfig,
    context: TrackingContext,
    graph: RefCell<DependencyGraph>,
    /// Raw target id -> its wrapper. Entries outlive the wrapper value so
    /// a rebuilt wrapper keeps its id; they go once the target is dropped.
    wrappers: RefCell<HashMap<ObjectId, WeakReactive>>,
    /// Registry size at which the next sweep happens.
    sweep_at: Cell<usize>,
}

/// Handle to a reactive runtime. Cloning is cheap and shares the runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Non-owning handle to a runtime.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the caller as the active effect when an effect finishes,
/// including when its computation panics.
pub(crate) struct EffectScope {
    runtime: Runtime,
    caller: Option<EffectId>,
}

impl Drop for EffectScope {
    fn drop(&mut self) {
        let context = &self.runtime.inner.context;
        context.set_active(self.caller);
        context.reset();
    }
}

/// Resets tracking on drop.
struct TrackingPause<'a>(&'a TrackingContext);

impl Drop for TrackingPause<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                context: TrackingContext::new(),
                graph: RefCell::new(DependencyGraph::new()),
                wrappers: RefCell::new(HashMap::new()),
                sweep_at: Cell::new(WRAPPER_SWEEP_FLOOR),
            }),
        }
    }

    /// The calling thread's default runtime.
    pub fn current() -> Self {
        CURRENT.with(Runtime::clone)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn label(&self) -> &str {
        &self.inner.config.label
    }

    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    pub(crate) fn warn_misuse(&self, message: &str) {
        if self.inner.config.warn_on_misuse {
            tracing::warn!(runtime = %self.label(), "{message}");
        }
    }

    // ------------------------------------------------------------------
    // Tracking context
    // ------------------------------------------------------------------

    /// The effect currently executing, if any.
    pub fn active_effect(&self) -> Option<EffectId> {
        self.inner.context.active_effect()
    }

    /// True when a read right now would record a dependency.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.is_tracking()
    }

    /// Stop recording reads until the matching [`reset_tracking`](Self::reset_tracking).
    pub fn pause_tracking(&self) {
        self.inner.context.pause();
    }

    /// Record reads until the matching [`reset_tracking`](Self::reset_tracking).
    pub fn enable_tracking(&self) {
        self.inner.context.enable();
    }

    pub fn reset_tracking(&self) {
        self.inner.context.reset();
    }

    /// Run `f` without recording any reads.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.context.pause();
        let _pause = TrackingPause(&self.inner.context);
        f()
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Create an effect that runs immediately and re-runs when anything it
    /// read changes.
    pub fn effect<T, F>(&self, func: F) -> Effect<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        Effect::new(self, func, EffectOptions::default())
    }

    pub fn effect_with<T, F>(&self, func: F, options: EffectOptions) -> Effect<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        Effect::new(self, func, options)
    }

    pub(crate) fn register_effect(&self, id: EffectId, subscriber: Weak<dyn Subscriber>) {
        self.inner.graph.borrow_mut().register_effect(id, subscriber);
    }

    /// Forget a dropped effect. If the graph is busy the node is left for
    /// the next lazy prune.
    pub(crate) fn release_effect(&self, id: EffectId) {
        if let Ok(mut graph) = self.inner.graph.try_borrow_mut() {
            graph.remove_effect(id);
        }
    }

    pub(crate) fn cleanup_effect(&self, id: EffectId) {
        self.inner.graph.borrow_mut().cleanup(id);
    }

    /// Whether `id` is on the caller chain starting at the active effect.
    pub(crate) fn is_running(&self, id: EffectId) -> bool {
        let graph = self.inner.graph.borrow();
        let mut cursor = self.active_effect();
        while let Some(current) = cursor {
            if current == id {
                return true;
            }
            cursor = graph.parent(current);
        }
        false
    }

    /// Make `id` the active effect, remembering the current one as its
    /// caller. Tracking is enabled for the duration of the scope.
    pub(crate) fn enter_effect(&self, id: EffectId) -> EffectScope {
        let caller = self.active_effect();
        self.inner.graph.borrow_mut().set_parent(id, caller);
        self.inner.context.set_active(Some(id));
        self.inner.context.enable();
        EffectScope {
            runtime: self.clone(),
            caller,
        }
    }

    /// Number of deps the effect is currently a member of.
    pub fn dependency_count(&self, id: EffectId) -> usize {
        self.inner.graph.borrow().dependency_count(id)
    }

    /// Number of effects subscribed to `(target, key)`.
    pub fn subscriber_count(&self, target: ObjectId, key: &TrackKey) -> usize {
        self.inner.graph.borrow().subscriber_count(target, key)
    }

    // ------------------------------------------------------------------
    // Track / trigger
    // ------------------------------------------------------------------

    /// Record that the active effect read `(target, key)`.
    ///
    /// A no-op when tracking is paused or no effect is running.
    pub fn track(&self, target: ObjectId, op: TrackOp, key: TrackKey) {
        if !self.is_tracking() {
            return;
        }
        let Some(effect) = self.active_effect() else {
            return;
        };

        let added = self
            .inner
            .graph
            .borrow_mut()
            .track(target, key.clone(), effect);
        if !added {
            return;
        }

        tracing::trace!(runtime = %self.label(), %target, %key, ?op, ?effect, "track");
        let subscriber = self.inner.graph.borrow().subscriber(effect);
        if let Some(subscriber) = subscriber {
            subscriber.on_track(&DebuggerEvent {
                effect,
                target,
                op: DebugOp::Track(op),
                key: Some(key),
            });
        }
    }

    /// Notify every effect invalidated by a write.
    ///
    /// `new_value` is consulted for writes to a sequence's `length`, where it
    /// carries the new length.
    pub fn trigger(
        &self,
        target: ObjectId,
        kind: TargetKind,
        op: TriggerOp,
        key: Option<TrackKey>,
        new_value: Option<&Value>,
    ) {
        let new_len = new_value
            .and_then(Value::as_f64)
            .filter(|n| *n >= 0.0)
            .map(|n| n as usize);

        let effects = self
            .inner
            .graph
            .borrow()
            .collect(target, kind, op, key.as_ref(), new_len);
        if effects.is_empty() {
            return;
        }

        tracing::trace!(
            runtime = %self.label(),
            %target,
            %kind,
            %op,
            key = ?key,
            effects = effects.len(),
            "trigger"
        );

        let active = self.active_effect();
        let mut saw_dead = false;
        let mut computed = Vec::new();
        let mut plain = Vec::new();
        {
            let graph = self.inner.graph.borrow();
            for effect in effects {
                if Some(effect) == active {
                    continue;
                }
                match graph.subscriber(effect) {
                    Some(subscriber) if subscriber.is_computed() => {
                        computed.push((effect, subscriber))
                    }
                    Some(subscriber) => plain.push((effect, subscriber)),
                    None => saw_dead = true,
                }
            }
        }

        for (effect, subscriber) in computed.into_iter().chain(plain) {
            subscriber.notify(&DebuggerEvent {
                effect,
                target,
                op: DebugOp::Trigger(op),
                key: key.clone(),
            });
        }

        if saw_dead {
            if let Ok(mut graph) = self.inner.graph.try_borrow_mut() {
                graph.prune_dead();
            }
        }
    }

    // ------------------------------------------------------------------
    // Wrapping factory
    // ------------------------------------------------------------------

    /// Wrap a value for observation.
    ///
    /// Raw targets get their (memoized) wrapper; wrappers are returned as
    /// they are; everything else passes through unchanged.
    pub fn reactive(&self, value: impl Into<Value>) -> Value {
        match value.into() {
            Value::Object(object) => match self.wrap(&object) {
                Some(reactive) => Value::Reactive(reactive),
                None => Value::Object(object),
            },
            value @ Value::Reactive(_) => value,
            other => {
                self.warn_misuse(&format!(
                    "value cannot be made reactive: {}",
                    other.type_name()
                ));
                other
            }
        }
    }

    /// The wrapper for a raw target, or `None` if the target was marked raw.
    pub fn wrap(&self, object: &Object) -> Option<Reactive> {
        if object.is_marked_raw() {
            return None;
        }

        let known = self
            .inner
            .wrappers
            .borrow()
            .get(&object.id())
            .map(|weak| (weak.live(), weak.id()));
        match known {
            Some((Some(existing), _)) => return Some(existing),
            Some((None, id)) => {
                let reactive = Reactive::with_id(self.clone(), object.clone(), id);
                self.inner
                    .wrappers
                    .borrow_mut()
                    .insert(object.id(), reactive.downgrade());
                return Some(reactive);
            }
            None => {}
        }

        let reactive = Reactive::with_id(self.clone(), object.clone(), ObjectId::next());
        let mut wrappers = self.inner.wrappers.borrow_mut();
        if wrappers.len() >= self.inner.sweep_at.get() {
            wrappers.retain(|_, weak| weak.is_alive());
            self.inner
                .sweep_at
                .set((wrappers.len() * 2).max(WRAPPER_SWEEP_FLOOR));
        }
        wrappers.insert(object.id(), reactive.downgrade());
        Some(reactive)
    }

    /// Deep-wrap a value read out of a target: raw targets become wrappers,
    /// anything else is returned unchanged.
    pub(crate) fn to_reactive(&self, value: Value) -> Value {
        match value {
            Value::Object(object) => match self.wrap(&object) {
                Some(reactive) => Value::Reactive(reactive),
                None => Value::Object(object),
            },
            other => other,
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.inner.graph.borrow();
        f.debug_struct("Runtime")
            .field("label", &self.label())
            .field("effects", &graph.effect_count())
            .field("wrappers", &self.inner.wrappers.borrow().len())
            .finish()
    }
}
