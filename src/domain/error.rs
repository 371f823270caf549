//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{ResourceId, Slot};

/// Domain errors represent violations of the lineage tree shape.
/// A ledger that triggers one of these breaks the at-most-two-children,
/// acyclic assumptions the trees rely on.
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("resource {parent} already has a {slot} child")]
    SlotOccupied { parent: ResourceId, slot: Slot },

    #[error("resource {parent} has {count} children, at most two are supported")]
    TooManyChildren { parent: ResourceId, count: usize },

    #[error("resource {child} attached under both {first} and {second}")]
    MultipleParents {
        child: ResourceId,
        first: ResourceId,
        second: ResourceId,
    },

    #[error("resource {resource} is its own ancestor, reached again below {descendant}")]
    Cycle {
        resource: ResourceId,
        descendant: ResourceId,
    },

    #[error("node is not part of this forest")]
    UnknownNode,
}

impl DomainError {
    /// True for errors caused by ledger data rather than by caller misuse.
    pub fn is_data_integrity(&self) -> bool {
        !matches!(self, DomainError::UnknownNode)
    }
}
