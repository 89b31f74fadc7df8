//! Domain error model.

use thiserror::Error;

use crate::money::Currency;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, identity clashes). Infrastructure concerns belong elsewhere.
///
/// Business-rule violations of a transfer are *not* errors: they are modelled as
/// terminal failure events by the transfer pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed currency code).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Arithmetic or comparison between two different currencies.
    #[error("currency mismatch: {left}/{right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    /// An identifier was invalid (e.g. blank).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// An entity with the same identity already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn currency_mismatch(left: &Currency, right: &Currency) -> Self {
        Self::CurrencyMismatch {
            left: left.clone(),
            right: right.clone(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists(what.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
