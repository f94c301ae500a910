//! Graph Nodes
//!
//! This module defines the two node types of the dependency graph: a
//! [`Dep`] (one observed location and the effects subscribed to it) and an
//! [`EffectNode`] (one effect and the deps it is a member of).
//!
//! Both sides refer to each other by id, never by owning pointer, so the
//! naturally cyclic effect <-> dep relation stays a pair of index tables.

use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;

use super::TrackKey;
use crate::reactive::{EffectId, Subscriber};
use crate::value::ObjectId;

/// Index of a dependency in the graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u32);

impl DepId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The set of effects subscribed to one (target, key) pair.
#[derive(Debug)]
pub struct Dep {
    target: ObjectId,
    key: TrackKey,
    /// Insertion-ordered so that effects fire in subscription order.
    subscribers: IndexSet<EffectId>,
}

impl Dep {
    pub(crate) fn new(target: ObjectId, key: TrackKey) -> Self {
        Self {
            target,
            key,
            subscribers: IndexSet::new(),
        }
    }

    pub fn target(&self) -> ObjectId {
        self.target
    }

    pub fn key(&self) -> &TrackKey {
        &self.key
    }

    /// Add a subscriber. Returns true if it was not already present.
    pub(crate) fn subscribe(&mut self, effect: EffectId) -> bool {
        self.subscribers.insert(effect)
    }

    pub(crate) fn unsubscribe(&mut self, effect: EffectId) {
        self.subscribers.shift_remove(&effect);
    }

    pub fn subscribers(&self) -> &IndexSet<EffectId> {
        &self.subscribers
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Graph-side bookkeeping for one effect.
pub(crate) struct EffectNode {
    /// Back-pointer to the effect. The runner owns it.
    subscriber: Weak<dyn Subscriber>,

    /// The effect that was active when this one last started running.
    parent: Option<EffectId>,

    /// Deps this effect is currently a member of (reverse edges).
    deps: HashSet<DepId>,
}

impl EffectNode {
    pub(crate) fn new(subscriber: Weak<dyn Subscriber>) -> Self {
        Self {
            subscriber,
            parent: None,
            deps: HashSet::new(),
        }
    }

    pub(crate) fn subscriber(&self) -> Option<Rc<dyn Subscriber>> {
        self.subscriber.upgrade()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.subscriber.strong_count() > 0
    }

    pub(crate) fn parent(&self) -> Option<EffectId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<EffectId>) {
        self.parent = parent;
    }

    pub(crate) fn add_dep(&mut self, dep: DepId) {
        self.deps.insert(dep);
    }

    pub(crate) fn take_deps(&mut self) -> HashSet<DepId> {
        std::mem::take(&mut self.deps)
    }

    pub(crate) fn dep_count(&self) -> usize {
        self.deps.len()
    }
}

impl fmt::Debug for EffectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectNode")
            .field("alive", &self.is_alive())
            .field("parent", &self.parent)
            .field("deps", &self.deps.len())
            .finish()
    }
}
