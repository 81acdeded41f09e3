//! Domain error model.

use thiserror::Error;

use crate::id::BeerId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Key a failed lookup was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Id(BeerId),
    Name(String),
}

impl core::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LookupKey::Id(id) => write!(f, "id {id}"),
            LookupKey::Name(name) => write!(f, "name {name:?}"),
        }
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic business-rule failures. Every variant is
/// an expected outcome reported to the immediate caller; storage failures
/// belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An item with this name is already in the catalog.
    #[error("beer with name {0:?} is already registered")]
    AlreadyRegistered(String),

    /// No item resolves for the given key.
    #[error("beer with {0} not found")]
    NotFound(LookupKey),

    /// Applying the increment would push quantity above the item's max.
    #[error("increment of {requested} for beer {id} would exceed max stock capacity of {max}")]
    StockExceeded { id: BeerId, requested: u32, max: u32 },

    /// A value failed validation (e.g. malformed input at a boundary).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn already_registered(name: impl Into<String>) -> Self {
        Self::AlreadyRegistered(name.into())
    }

    pub fn not_found_id(id: BeerId) -> Self {
        Self::NotFound(LookupKey::Id(id))
    }

    pub fn not_found_name(name: impl Into<String>) -> Self {
        Self::NotFound(LookupKey::Name(name.into()))
    }

    pub fn stock_exceeded(id: BeerId, requested: u32, max: u32) -> Self {
        Self::StockExceeded { id, requested, max }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
