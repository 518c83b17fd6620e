//! Error types for Trellis.

use thiserror::Error;
use trellis_core::logging::targets;

use crate::model::entity::{EntityId, EntityKind};
use crate::model::traits::StructuralKind;

/// Errors raised by the editing surface: mediators, commands and the
/// command executor.
///
/// View-facing accessors never return these. They answer a bad address
/// with [`ModelIndex::invalid`](crate::model::ModelIndex::invalid) or
/// `false`, because views probe addresses speculatively.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A handle failed bounds or liveness checks.
    #[error("invalid model index")]
    InvalidIndex,

    /// The entity cannot hold children in this mediator (flat models), or
    /// is not attached.
    #[error("entity {0} cannot be used as a parent here")]
    InvalidParent(EntityId),

    /// An insert or remove run falls outside the parent's children.
    #[error("cannot touch {count} row(s) at {position}: parent has {row_count} row(s)")]
    OutOfRange {
        position: usize,
        count: usize,
        row_count: usize,
    },

    /// A structural mutation was requested while a bracket was open on the
    /// same mediator.
    #[error("structural mutation rejected: a {open} bracket is still open")]
    ReentrantMutation { open: StructuralKind },

    /// The tree's single-owner invariant does not hold for the requested
    /// operation.
    #[error("structural violation: {0}")]
    StructuralViolation(String),

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// `end_macro` without a matching `begin_macro`.
    #[error("no macro is open")]
    NoOpenMacro,

    #[error("no schema registered for entity kind `{0}`")]
    UnknownKind(EntityKind),
}

impl ModelError {
    /// A broken ownership invariant: logged, fatal in debug builds.
    pub(crate) fn violation(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(target: targets::MODEL, detail = %message, "structural violation");
        debug_assert!(false, "structural violation: {message}");
        ModelError::StructuralViolation(message)
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
