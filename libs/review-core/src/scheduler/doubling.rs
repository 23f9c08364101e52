//! Exponential backoff scheduling.
//!
//! Difficulty moves one step per grade (down on success, up on failure) and is
//! clamped to `MIN_DIFFICULTY..=MAX_DIFFICULTY`. The next interval is
//! `2^difficulty` days, so intervals range from 2 to 32 days.
//!
//! The interval is always measured from the moment of grading. How long a card
//! sat overdue does not influence it.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use super::{SchedulingAlgorithm, MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::error::{Result, ReviewError};
use crate::types::{Card, Grade};

pub(crate) const NAME: &str = "doubling";

/// The difficulty-exponent rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct Doubling;

impl Doubling {
    /// Difficulty after applying `grade` to a card at `difficulty`.
    pub fn next_difficulty(difficulty: u8, grade: Grade) -> u8 {
        match grade {
            Grade::Success => difficulty.saturating_sub(1).max(MIN_DIFFICULTY),
            Grade::Fail => difficulty.saturating_add(1).min(MAX_DIFFICULTY),
        }
    }

    /// Review interval for a card at `difficulty`.
    pub fn interval_for(difficulty: u8) -> Duration {
        Duration::days(1_i64 << difficulty)
    }
}

impl SchedulingAlgorithm for Doubling {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schedule(&self, card: &Card, grade: Grade, now: DateTime<Utc>) -> Result<Card> {
        if let Err(err) = card.validate() {
            warn!(card_id = %card.id, error = %err, "refusing to schedule invalid card");
            return Err(err);
        }

        let difficulty = Self::next_difficulty(card.difficulty, grade);
        let overflow =
            |field: &str| ReviewError::InvalidState(format!("card {}: {} overflow", card.id, field));
        let next_due = now
            .checked_add_signed(Self::interval_for(difficulty))
            .ok_or_else(|| overflow("next_due"))?;
        let review_count = card
            .review_count
            .checked_add(1)
            .ok_or_else(|| overflow("review_count"))?;
        let success_count = if grade.is_success() {
            card.success_count
                .checked_add(1)
                .ok_or_else(|| overflow("success_count"))?
        } else {
            card.success_count
        };
        let version = card
            .version
            .checked_add(1)
            .ok_or_else(|| overflow("version"))?;

        Ok(Card {
            difficulty,
            review_count,
            success_count,
            last_reviewed: Some(now),
            next_due: Some(next_due),
            version,
            ..card.clone()
        })
    }
}
