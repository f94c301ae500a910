//! Dependency Graph
//!
//! This module implements the bipartite graph between observed locations and
//! the effects that read them.
//!
//! # Overview
//!
//! - A [`Dep`] is one observed location: a (target, key) pair plus the set of
//!   effects subscribed to it.
//! - An effect node records the deps the effect is a member of, so that all
//!   of its edges can be removed before it re-runs.
//! - The [`DependencyGraph`] indexes deps by target, then by key.
//!
//! # Design Decisions
//!
//! 1. Deps live in an arena and are addressed by [`DepId`]. They are created
//!    lazily on the first read and never evicted; the graph lives as long as
//!    its runtime.
//!
//! 2. Effect nodes hold only a weak pointer to their effect. The graph never
//!    keeps an effect alive; dead nodes are pruned lazily.
//!
//! 3. Both edge directions are stored, so cleanup before a re-run is
//!    proportional to the number of edges of that one effect.

mod node;
mod registry;

pub use node::{Dep, DepId};
pub use registry::DependencyGraph;

use std::fmt;

use crate::value::{Key, PropKey};

/// The key half of an observed location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackKey {
    /// A record field, a sequence index, a sequence's `length`, or a ref's
    /// `value`.
    Prop(PropKey),
    /// A map or set entry.
    Entry(Key),
    /// Fires when what iteration enumerates changes.
    Iterate,
    /// Fires only when a map's set of keys changes.
    MapKeyIterate,
}

impl TrackKey {
    /// The sequence `length` key.
    pub fn length() -> Self {
        TrackKey::Prop(PropKey::Name(PropKey::LENGTH.into()))
    }

    /// The key a ref tracks its boxed value under.
    pub fn value() -> Self {
        TrackKey::Prop(PropKey::Name("value".into()))
    }

    pub fn is_length(&self) -> bool {
        matches!(self, TrackKey::Prop(key) if key.is_length())
    }

    pub fn is_index(&self) -> bool {
        matches!(self, TrackKey::Prop(PropKey::Index(_)))
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKey::Prop(key) => write!(f, "{key}"),
            TrackKey::Entry(key) => write!(f, "entry({key:?})"),
            TrackKey::Iterate => f.write_str("<iterate>"),
            TrackKey::MapKeyIterate => f.write_str("<map-key-iterate>"),
        }
    }
}

/// Kind of read that created an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOp {
    Get,
    Has,
    Iterate,
}

/// Kind of write that invalidates deps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOp {
    Set,
    Add,
    Delete,
    Clear,
}

impl fmt::Display for TriggerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerOp::Set => "set",
            TriggerOp::Add => "add",
            TriggerOp::Delete => "delete",
            TriggerOp::Clear => "clear",
        })
    }
}
