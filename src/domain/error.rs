//! Domain Layer - Errors
//!
//! Every failure the core can report. All of them are returned to the caller as
//! values; the view layer decides how to present them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DomainError {
    /// Name was blank or whitespace-only
    #[error("Item name must not be empty")]
    EmptyName,
    /// Another item already uses this name
    #[error("An item named '{0}' already exists")]
    DuplicateName(String),
    /// No row matched the id (zero rows affected)
    #[error("Item {0} not found")]
    NotFound(u32),
    /// Form input that could not be converted, e.g. a non-numeric price
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Underlying storage failure
    #[error("Store error: {0}")]
    Store(String),
}
