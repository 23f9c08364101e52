//! Review scheduling.
//!
//! A scheduler is a pure function from (card, grade, now) to the card's next
//! state. It performs no I/O; persisting the result is the caller's job.

pub mod doubling;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Card, Grade};

pub use doubling::Doubling;

/// Lowest (best known) difficulty a card can have.
pub const MIN_DIFFICULTY: u8 = 1;

/// Highest difficulty a card can have.
pub const MAX_DIFFICULTY: u8 = 5;

/// Trait for spaced repetition scheduling rules.
pub trait SchedulingAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Compute the card's state after it was graded at `now`.
    ///
    /// Fails with `InvalidState` if `card` already violates its invariants.
    fn schedule(&self, card: &Card, grade: Grade, now: DateTime<Utc>) -> Result<Card>;
}

/// Apply a grade using the default doubling rule.
pub fn apply_grade(card: &Card, success: bool, now: DateTime<Utc>) -> Result<Card> {
    Doubling.schedule(card, Grade::from_success(success), now)
}

/// Get algorithm by name.
pub fn get_algorithm(name: &str) -> Option<Box<dyn SchedulingAlgorithm>> {
    match name {
        doubling::NAME => Some(Box::new(Doubling)),
        _ => None,
    }
}
