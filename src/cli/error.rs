//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::{InfraError, LedgerError};

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<LedgerError> for CliError {
    fn from(e: LedgerError) -> Self {
        CliError::Infra(InfraError::Ledger(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

fn ledger_exit_code(e: &LedgerError) -> i32 {
    match e {
        LedgerError::Open { .. } => exitcode::NOINPUT,
        LedgerError::MissingTimeInfo => exitcode::DATAERR,
        LedgerError::Query { .. } => exitcode::IOERR,
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Ledger(e) => ledger_exit_code(e),
                InfraError::Application(e) => match e {
                    ApplicationError::Domain(e) if e.is_data_integrity() => exitcode::DATAERR,
                    ApplicationError::Domain(_) => exitcode::SOFTWARE,
                    ApplicationError::Ledger(e) => ledger_exit_code(e),
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => exitcode::CANTCREAT,
                },
            },
        }
    }
}
