//! Error types for review-core.

use thiserror::Error;

use crate::types::CardId;

/// Result type alias using ReviewError.
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Errors surfaced by the scheduler and the review session controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("invalid card state: {0}")]
    InvalidState(String),

    #[error("cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: &'static str,
    },

    #[error("card {id} was modified concurrently (expected version {expected})")]
    ConcurrentModification { id: CardId, expected: u64 },

    #[error("card not found: {0}")]
    NotFound(CardId),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors reported by a card store implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("card not found: {0}")]
    NotFound(CardId),

    #[error("version conflict on card {id}: expected {expected}, found {actual}")]
    VersionConflict { id: CardId, expected: u64, actual: u64 },

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for ReviewError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::VersionConflict { id, expected, .. } => {
                Self::ConcurrentModification { id, expected }
            }
            StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}
