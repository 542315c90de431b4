//! Transfer error types.
//!
//! Precondition violations are detected before any unit of work is opened and
//! are kept distinct from store failures. Store failures (unknown account,
//! lock timeout, deadlock, serialization conflict) pass through unchanged.

use ledgerflow_shared::AppError;
use ledgerflow_shared::types::AccountId;
use thiserror::Error;

/// Errors returned by the transfer executor.
///
/// `E` is the error type of the backing store.
#[derive(Debug, Error)]
pub enum TransferError<E> {
    // ========== Precondition Errors ==========
    /// Amount must be strictly positive.
    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(i64),

    /// Source and destination are the same account.
    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(AccountId),

    // ========== Store Errors ==========
    /// The store failed; the unit of work was rolled back.
    #[error(transparent)]
    Store(E),
}

impl<E> TransferError<E> {
    /// Returns true if the request was rejected before touching the store.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::InvalidAmount(_) | Self::SameAccount(_))
    }

    /// Returns the underlying store error, if any.
    #[must_use]
    pub const fn store_error(&self) -> Option<&E> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::SameAccount(_) => "SAME_ACCOUNT",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) | Self::SameAccount(_) => 400,
            Self::Store(_) => 500,
        }
    }
}

impl<E: std::fmt::Display> From<TransferError<E>> for AppError {
    fn from(err: TransferError<E>) -> Self {
        match err {
            TransferError::Store(inner) => Self::Database(inner.to_string()),
            precondition => Self::Validation(precondition.to_string()),
        }
    }
}
