//! Invalidation Registry
//!
//! The registry maps target -> key -> [`Dep`] and owns the effect nodes.
//! It knows nothing about running effects: [`DependencyGraph::collect`]
//! only answers "which effects does this write invalidate", and the runtime
//! decides what to do with them.
//!
//! # Invalidation rules
//!
//! | write                                | deps included                              |
//! |--------------------------------------|--------------------------------------------|
//! | `Clear`                              | every dep of the target                    |
//! | sequence `length`                    | `length`, plus every index >= new length   |
//! | anything else                        | the dep of the exact key                   |
//! | + `Add`, not a sequence              | + iterate (+ map-key iterate for maps)     |
//! | + `Add`, sequence, integer key       | + `length`                                 |
//! | + `Set`, map                         | + iterate                                  |
//! | + `Delete`, not a sequence           | + iterate (+ map-key iterate for maps)     |
//!
//! The resulting effect set is de-duplicated, so an effect reached through
//! two deps fires once.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::node::{Dep, DepId, EffectNode};
use super::{TrackKey, TriggerOp};
use crate::reactive::{EffectId, Subscriber};
use crate::value::{ObjectId, PropKey, TargetKind};

/// Target -> key -> dep, plus the effect arena.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    targets: HashMap<ObjectId, HashMap<TrackKey, DepId>>,
    deps: Vec<Dep>,
    effects: HashMap<EffectId, EffectNode>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    pub(crate) fn register_effect(&mut self, id: EffectId, subscriber: Weak<dyn Subscriber>) {
        self.effects.insert(id, EffectNode::new(subscriber));
    }

    /// Drop an effect node together with all of its edges.
    pub(crate) fn remove_effect(&mut self, id: EffectId) {
        self.cleanup(id);
        self.effects.remove(&id);
    }

    pub(crate) fn subscriber(&self, id: EffectId) -> Option<Rc<dyn Subscriber>> {
        self.effects.get(&id).and_then(EffectNode::subscriber)
    }

    pub(crate) fn parent(&self, id: EffectId) -> Option<EffectId> {
        self.effects.get(&id).and_then(EffectNode::parent)
    }

    pub(crate) fn set_parent(&mut self, id: EffectId, parent: Option<EffectId>) {
        if let Some(node) = self.effects.get_mut(&id) {
            node.set_parent(parent);
        }
    }

    pub fn contains_effect(&self, id: EffectId) -> bool {
        self.effects.contains_key(&id)
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Number of deps the effect is currently a member of.
    pub fn dependency_count(&self, id: EffectId) -> usize {
        self.effects.get(&id).map_or(0, EffectNode::dep_count)
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Record that `effect` read `(target, key)`.
    ///
    /// Returns true if the edge is new. Unknown effects are ignored.
    pub(crate) fn track(&mut self, target: ObjectId, key: TrackKey, effect: EffectId) -> bool {
        if !self.effects.contains_key(&effect) {
            return false;
        }

        let dep_id = self.dep_for(target, key);
        let added = self.deps[dep_id.index()].subscribe(effect);
        if added {
            if let Some(node) = self.effects.get_mut(&effect) {
                node.add_dep(dep_id);
            }
        }
        added
    }

    fn dep_for(&mut self, target: ObjectId, key: TrackKey) -> DepId {
        let keys = self.targets.entry(target).or_default();
        if let Some(id) = keys.get(&key) {
            return *id;
        }
        let id = DepId::from_index(self.deps.len());
        self.deps.push(Dep::new(target, key.clone()));
        keys.insert(key, id);
        id
    }

    /// Remove the effect from every dep it is a member of.
    pub(crate) fn cleanup(&mut self, effect: EffectId) {
        let Some(node) = self.effects.get_mut(&effect) else {
            return;
        };
        for dep_id in node.take_deps() {
            self.deps[dep_id.index()].unsubscribe(effect);
        }
    }

    /// Drop nodes whose effect no longer exists.
    pub(crate) fn prune_dead(&mut self) {
        let dead: Vec<EffectId> = self
            .effects
            .iter()
            .filter(|(_, node)| !node.is_alive())
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            self.remove_effect(id);
        }
    }

    pub fn dep(&self, target: ObjectId, key: &TrackKey) -> Option<&Dep> {
        self.targets
            .get(&target)
            .and_then(|keys| keys.get(key))
            .map(|id| &self.deps[id.index()])
    }

    /// Number of effects subscribed to `(target, key)`.
    pub fn subscriber_count(&self, target: ObjectId, key: &TrackKey) -> usize {
        self.dep(target, key).map_or(0, Dep::len)
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Compute the effects invalidated by a write, following the rule table
    /// in the module docs.
    ///
    /// `new_len` is only consulted for writes to a sequence's `length`.
    pub fn collect(
        &self,
        target: ObjectId,
        kind: TargetKind,
        op: TriggerOp,
        key: Option<&TrackKey>,
        new_len: Option<usize>,
    ) -> IndexSet<EffectId> {
        let mut effects = IndexSet::new();
        let Some(keys) = self.targets.get(&target) else {
            return effects;
        };

        let mut deps: SmallVec<[DepId; 4]> = SmallVec::new();

        if op == TriggerOp::Clear {
            deps.extend(keys.values().copied());
        } else if kind.is_sequence() && key.is_some_and(TrackKey::is_length) {
            let new_len = new_len.unwrap_or(0);
            deps.extend(keys.iter().filter_map(|(k, id)| match k {
                k if k.is_length() => Some(*id),
                TrackKey::Prop(PropKey::Index(index)) if *index >= new_len => Some(*id),
                _ => None,
            }));
        } else {
            if let Some(dep) = key.and_then(|k| keys.get(k)) {
                deps.push(*dep);
            }

            let mut push = |k: &TrackKey| {
                if let Some(dep) = keys.get(k) {
                    deps.push(*dep);
                }
            };

            match op {
                TriggerOp::Add | TriggerOp::Delete if !kind.is_sequence() => {
                    push(&TrackKey::Iterate);
                    if kind.is_associative() {
                        push(&TrackKey::MapKeyIterate);
                    }
                }
                TriggerOp::Add if key.is_some_and(TrackKey::is_index) => {
                    push(&TrackKey::length());
                }
                TriggerOp::Set if kind.is_associative() => {
                    push(&TrackKey::Iterate);
                }
                _ => {}
            }
        }

        for dep_id in deps {
            effects.extend(self.deps[dep_id.index()].subscribers().iter().copied());
        }
        effects
    }
}
