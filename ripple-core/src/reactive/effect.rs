//! Effect Implementation
//!
//! An Effect is a re-runnable computation that records what it reads and is
//! re-run when any of it changes.
//!
//! # How Effects Work
//!
//! 1. On creation the effect runs once (unless `lazy`) to discover its
//!    dependencies.
//!
//! 2. When a dependency changes, the runtime calls the effect's scheduler if
//!    it has one, otherwise re-runs it synchronously.
//!
//! 3. Before every run the effect leaves every dep it joined last time, so
//!    dependencies follow the branches the computation actually took.
//!
//! # Re-entrancy
//!
//! An effect that is already on the current caller chain refuses to run
//! again and `run` returns `None`. This is what stops an effect that writes
//! to the state it reads from triggering itself forever.
//!
//! # Ownership
//!
//! The [`Effect`] handle owns the computation. The runtime only keeps a weak
//! pointer, so dropping the last handle retires the effect: it is never
//! invoked again.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::Runtime;
use super::subscriber::{DebuggerEvent, EffectId, Subscriber};

/// Called instead of re-running when a dependency changes.
pub type Scheduler = Rc<dyn Fn()>;

/// Debug hook receiving track or trigger events.
pub type DebugHook = Rc<dyn Fn(&DebuggerEvent)>;

/// Options accepted by [`Runtime::effect_with`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Skip the initial run.
    pub lazy: bool,
    pub scheduler: Option<Scheduler>,
    pub on_track: Option<DebugHook>,
    pub on_trigger: Option<DebugHook>,
    pub on_stop: Option<Rc<dyn Fn()>>,
    /// Set for the effect behind a computed ref.
    pub(crate) computed: bool,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn scheduler(mut self, scheduler: impl Fn() + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    pub fn on_track(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_track = Some(Rc::new(hook));
        self
    }

    pub fn on_trigger(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_trigger = Some(Rc::new(hook));
        self
    }

    pub fn on_stop(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_stop = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .field("on_track", &self.on_track.is_some())
            .field("on_trigger", &self.on_trigger.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .field("computed", &self.computed)
            .finish()
    }
}

struct EffectInner<T> {
    id: EffectId,
    runtime: Runtime,
    func: Box<dyn Fn() -> T>,
    options: EffectOptions,
    /// Cleared by `stop`.
    active: Cell<bool>,
    run_count: Cell<usize>,
}

impl<T> EffectInner<T> {
    fn run(&self) -> Option<T> {
        if !self.active.get() {
            return match self.options.scheduler {
                Some(_) => None,
                None => Some((self.func)()),
            };
        }

        if self.runtime.is_running(self.id) {
            tracing::debug!(
                runtime = %self.runtime.label(),
                effect = ?self.id,
                "effect is already running; skipping re-entrant run"
            );
            return None;
        }

        self.runtime.cleanup_effect(self.id);
        let _scope = self.runtime.enter_effect(self.id);
        self.run_count.set(self.run_count.get() + 1);
        Some((self.func)())
    }

    fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }
        self.runtime.cleanup_effect(self.id);
        if let Some(on_stop) = &self.options.on_stop {
            on_stop();
        }
        tracing::debug!(runtime = %self.runtime.label(), effect = ?self.id, "effect stopped");
    }
}

impl<T> Subscriber for EffectInner<T> {
    fn notify(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.options.on_trigger {
            hook(event);
        }
        match &self.options.scheduler {
            Some(scheduler) => scheduler(),
            None => {
                self.run();
            }
        }
    }

    fn on_track(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.options.on_track {
            hook(event);
        }
    }

    fn is_computed(&self) -> bool {
        self.options.computed
    }
}

impl<T> Drop for EffectInner<T> {
    fn drop(&mut self) {
        self.runtime.release_effect(self.id);
    }
}

/// Runner handle for an effect.
///
/// Cloning the handle shares the same effect. Dropping the last handle
/// retires it.
#[must_use = "an effect is retired as soon as its last handle is dropped"]
pub struct Effect<T> {
    inner: Rc<EffectInner<T>>,
}

impl<T: 'static> Effect<T> {
    pub(crate) fn new<F>(runtime: &Runtime, func: F, options: EffectOptions) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let lazy = options.lazy;
        let inner = Rc::new(EffectInner {
            id: EffectId::new(),
            runtime: runtime.clone(),
            func: Box::new(func),
            options,
            active: Cell::new(true),
            run_count: Cell::new(0),
        });

        let weak: Weak<dyn Subscriber> = Rc::downgrade(&inner) as Weak<dyn Subscriber>;
        runtime.register_effect(inner.id, weak);
        tracing::debug!(runtime = %runtime.label(), effect = ?inner.id, lazy, "effect created");

        if !lazy {
            inner.run();
        }

        Self { inner }
    }
}

impl<T> Effect<T> {
    /// Run the computation now, re-collecting dependencies.
    ///
    /// Returns `None` if the effect is already running further up the call
    /// stack, or if it was stopped and has a scheduler.
    pub fn run(&self) -> Option<T> {
        self.inner.run()
    }

    /// Detach the effect from all dependencies. It will not be notified
    /// again.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of dependencies recorded by the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.runtime.dependency_count(self.inner.id)
    }
}

impl<T> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
