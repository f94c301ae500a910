//! Error types for the reactive engine.
//!
//! Reads never fail. Writes, deletes and shape-specific operations (such as
//! `push` or `add`) return [`Result`] so that a failure of the underlying
//! primitive surfaces at the call site of the offending operation.

use thiserror::Error;

use crate::value::TargetKind;

/// Errors raised by writes and shape-specific operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReactiveError {
    /// The property cannot be deleted (e.g. a sequence's `length`).
    #[error("cannot delete non-configurable property `{0}`")]
    NonConfigurable(String),

    /// A sequence length must be a non-negative integer.
    #[error("invalid sequence length: {0}")]
    InvalidLength(f64),

    /// Sequences only accept integer indices and `length`.
    #[error("`{key}` is not a valid key for a sequence")]
    InvalidKey { key: String },

    /// The operation does not exist for this target shape.
    #[error("`{op}` is not supported on {kind} targets")]
    Unsupported { op: &'static str, kind: TargetKind },

    /// Weak collections only accept identity-bearing keys.
    #[error("invalid value used as weak collection key")]
    InvalidWeakKey,

    /// The operation needs a record, sequence or collection.
    #[error("expected a target, found {0}")]
    NotATarget(&'static str),

    /// Plain computed values have no setter.
    #[error("computed value is read-only")]
    ReadonlyComputed,
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
