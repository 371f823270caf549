//! Domain layer: resource entities and the lineage forest
//!
//! This layer is independent of external concerns (no ledger access, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;

pub use arena::{ForestResult, LineageForest, LineageNode};
pub use entities::*;
pub use error::DomainError;
