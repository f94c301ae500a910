//! Reactive Primitives
//!
//! This module implements the core of the engine: observation wrappers,
//! effects and the runtime that connects them.
//!
//! # Concepts
//!
//! ## Wrappers
//!
//! A [`Reactive`] wraps a raw target. Reading through it records which
//! `(target, key)` pairs the running effect depends on; writing through it
//! notifies exactly the effects that depend on what changed.
//!
//! ## Effects
//!
//! An [`Effect`] is a computation that runs, records what it read, and is
//! re-run (or has its scheduler called) when any of it changes.
//! Dependencies are re-collected on every run, so an effect only ever
//! depends on the branch it actually took last time.
//!
//! # Implementation Notes
//!
//! Tracking is implicit: the runtime knows the active effect, and every
//! tracked read made while it runs is attributed to it. This is the
//! "transparent reactivity" used by Vue 3, SolidJS and Leptos, with explicit
//! `get`/`set` accessors standing in for native property interception.

mod base;
mod collection;
mod context;
mod effect;
mod runtime;
mod subscriber;
mod wrapper;

pub use collection::IterItem;
pub use effect::{DebugHook, Effect, EffectOptions, Scheduler};
pub use runtime::Runtime;
pub use subscriber::{DebugOp, DebuggerEvent, EffectId};
pub use wrapper::{is_reactive, to_raw, Reactive};

pub(crate) use subscriber::Subscriber;
pub(crate) use wrapper::WeakReactive;
