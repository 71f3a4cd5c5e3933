// src/error.rs
//
// Error taxonomy. "Subject not found" and "the store blew up" are distinct
// outcomes; neither is ever conflated with a legitimately empty result set.

use thiserror::Error;

/// Opaque failure raised by an injected store or directory implementation.
///
/// The core never retries and never inspects the inner error; it is carried
/// to the caller unmodified. Retry policy, if any, belongs to the store.
#[derive(Debug, Error)]
#[error("store failure: {0}")]
pub struct StoreError(pub Box<dyn std::error::Error + Send + Sync>);

impl StoreError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError(err.into())
    }
}

/// Top-level error type for investigation operations.
#[derive(Debug, Error)]
pub enum InvestigateError {
    /// The subject id could not be resolved by the directory. Returned
    /// explicitly; an empty session history is *not* a not-found condition.
    #[error("subject {0} not found")]
    SubjectNotFound(String),

    /// An injected store or directory lookup failed. Propagated as-is.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-record validation failure, detected at the aggregation boundary.
/// Offending records are skipped and counted, never silently dropped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    #[error("session end precedes start")]
    NegativeDuration,
}
