//! Domain error model.

use thiserror::Error;

use crate::id::ItemId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing records, stock rules, conflicts). Storage failures belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced record does not exist (or is outside the caller's branch).
    #[error("{0} not found")]
    NotFound(String),

    /// A deduction would drive an item's quantity below zero.
    #[error("insufficient stock for item {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: ItemId,
        available: i64,
        requested: i64,
    },

    /// A conflict occurred (e.g. duplicate business key).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authorization failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn item_not_found(item_id: ItemId) -> Self {
        Self::NotFound(format!("inventory item {item_id}"))
    }

    pub fn insufficient_stock(item_id: ItemId, available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            item_id,
            available,
            requested,
        }
    }
}
