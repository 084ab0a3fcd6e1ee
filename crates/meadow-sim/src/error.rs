//! Error types for simulation operations.

use meadow_protocol::EntityId;
use thiserror::Error;

/// Errors returned by simulation operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// No live entity with this id.
    #[error("entity not found (entity_id={0})")]
    EntityNotFound(EntityId),
    /// The entity lacks the component an operation needs.
    #[error("entity is missing component (entity_id={entity_id}, component={component})")]
    MissingComponent {
        entity_id: EntityId,
        component: &'static str,
    },
}
