//! The module contains the error the ledger can throw.
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Invalid transaction kind: {0}")]
    InvalidKind(String),
    #[error("Remote balance store unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("Local balance storage failed: {0}")]
    Storage(String),
    #[error("\"{0}\" context is closed")]
    ContextClosed(&'static str),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::RemoteUnavailable(a), Self::RemoteUnavailable(b)) => a == b,
            (Self::Storage(a), Self::Storage(b)) => a == b,
            (Self::ContextClosed(a), Self::ContextClosed(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
