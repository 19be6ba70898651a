//! Error types for ledger_engine

use card_common::CatalogError;
use std::fmt;

/// Unified error type for ledger operations
#[derive(Debug)]
pub enum LedgerError {
    /// A required input was missing or malformed
    Validation(String),
    /// A referenced collection or card does not exist
    NotFound(String),
    /// The external catalog failed or returned malformed data
    Catalog(CatalogError),
    /// The underlying store rejected a read or write
    Database(rusqlite::Error),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Validation(msg) => write!(f, "Validation error: {}", msg),
            LedgerError::NotFound(what) => write!(f, "Not found: {}", what),
            LedgerError::Catalog(e) => write!(f, "Catalog error: {}", e),
            LedgerError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::Validation(_) => None,
            LedgerError::NotFound(_) => None,
            LedgerError::Catalog(e) => Some(e),
            LedgerError::Database(e) => Some(e),
        }
    }
}

impl From<CatalogError> for LedgerError {
    fn from(err: CatalogError) -> Self {
        LedgerError::Catalog(err)
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Database(err)
    }
}

/// Result alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
