//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic and depends on the ledger boundary trait.

pub mod error;
pub mod error_ext;
pub mod graph;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use graph::{dot_edges, dot_graph, TreeRender};
