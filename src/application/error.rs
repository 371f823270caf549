//! Application-level errors (wraps domain and ledger errors)

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::traits::LedgerError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("ledger data integrity: {0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Ledger(#[from] LedgerError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
