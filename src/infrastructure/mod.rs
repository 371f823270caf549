//! Infrastructure layer: ledger access
//!
//! This layer implements the ledger boundary trait over SQLite.

pub mod error;
pub mod ledger;
pub mod traits;

pub use error::{InfraError, InfraResult};
pub use ledger::SqliteLedger;
pub use traits::{LedgerError, LedgerResult, ResourceLedger};
