//! Spaced repetition review scheduling.
//!
//! Provides:
//! - The doubling scheduler (difficulty 1..=5, interval `2^difficulty` days)
//! - The card store contract with optimistic concurrency, plus an in-memory store
//! - The review session controller (present, reveal, grade)
//! - Shared types (Card, Grade, errors)

pub mod clock;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, ReviewError, StoreError};
pub use scheduler::{apply_grade, get_algorithm, Doubling, SchedulingAlgorithm};
pub use session::{CardPhase, ReviewSession, SessionSummary, DEFAULT_BATCH_SIZE};
pub use store::{due_order, CardStore, MemoryCardStore, StoreResult};
pub use types::{Card, CardId, Grade, NewCard, OwnerId, PathId};
