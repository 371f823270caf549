//! Ledger boundary trait
//!
//! Abstracts the read queries issued against the simulation ledger so that
//! services can run over any store (SQLite file, in-memory database, fakes).

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{AgentId, ResourceId, ResourceRecord, SimulationWindow, TransferRecord};

/// Failure to read from the ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("cannot open ledger {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("ledger query failed: {context}")]
    Query {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("ledger has no simulation time info")]
    MissingTimeInfo,
}

impl LedgerError {
    /// Create a query error with context.
    pub fn query(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Query {
            context: context.into(),
            source,
        }
    }
}

/// Result type for ledger reads.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Read-only access to resource, transfer and simulation records.
pub trait ResourceLedger {
    /// Create lookup indexes used by the other queries.
    ///
    /// Must be idempotent; calling it is optional for correctness.
    fn prepare(&self) -> LedgerResult<()>;

    /// Resources with no parent at all.
    fn parentless_resources(&self) -> LedgerResult<Vec<ResourceRecord>>;

    /// Resources naming `id` as first or second parent, in a stable order.
    fn children_of(&self, id: ResourceId) -> LedgerResult<Vec<ResourceRecord>>;

    /// Transfers where `agent` is sender or receiver, ordered by time.
    fn transfers_involving(&self, agent: AgentId) -> LedgerResult<Vec<TransferRecord>>;

    /// Start and duration of the simulation.
    fn simulation_window(&self) -> LedgerResult<SimulationWindow>;

    /// Every participant known to the ledger.
    fn agents(&self) -> LedgerResult<Vec<AgentId>>;
}
