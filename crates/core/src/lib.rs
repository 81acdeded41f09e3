//! `beerstock-core`: shared domain primitives.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! the catalog identifier and the business-rule error model.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult, LookupKey};
pub use id::BeerId;
