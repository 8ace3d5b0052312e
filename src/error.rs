//! Error types for scene operations.
//!
//! Most store operations are deliberately silent when an id is missing and
//! report that through `bool`/`Option` returns instead. [`SceneError`] is
//! used where the caller must see the failure: connection validation, the
//! coupling invariant check and template loading.

use thiserror::Error;

use crate::model::ElementId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("element {0} not found")]
    NotFound(ElementId),

    #[error("invalid connection: {0}")]
    InvalidConnection(#[from] ConnectionRejection),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Why a connection request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionRejection {
    #[error("endpoint {0} does not exist")]
    MissingEndpoint(ElementId),

    #[error("element {0} cannot connect to itself")]
    SelfLoop(ElementId),

    #[error("timeline element {0} is not connectable")]
    TimelineEndpoint(ElementId),
}
