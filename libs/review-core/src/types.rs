//! Core types for the review scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ReviewError};
use crate::scheduler::{MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Card identifier.
pub type CardId = Uuid;

/// Identifier of the user a card belongs to.
pub type OwnerId = Uuid;

/// Learning path a card is filed under. Only used for filtering by callers.
pub type PathId = Uuid;

/// Outcome of a single recall attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Fail,
    Success,
}

impl Grade {
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Fail
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Payload for creating a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCard {
    pub owner: OwnerId,
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_id: Option<PathId>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A single front/back fact scheduled for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub owner: OwnerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_id: Option<PathId>,
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
    pub difficulty: u8,
    pub review_count: u32,
    pub success_count: u32,
    /// `None` until the first grade.
    pub last_reviewed: Option<DateTime<Utc>>,
    /// `None` means the card has never been scheduled and is due immediately.
    pub next_due: Option<DateTime<Utc>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Build a freshly created card: easiest difficulty, never reviewed, due now.
    pub fn create(id: CardId, new: NewCard, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner: new.owner,
            path_id: new.path_id,
            front: new.front,
            back: new.back,
            tags: new.tags,
            difficulty: MIN_DIFFICULTY,
            review_count: 0,
            success_count: 0,
            last_reviewed: None,
            next_due: None,
            version: 1,
            created_at,
        }
    }

    /// Whether the card should be shown at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due.map_or(true, |due| due <= now)
    }

    /// Check the card's invariants.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(ReviewError::InvalidState(format!(
                "card {}: difficulty {} outside {}..={}",
                self.id, self.difficulty, MIN_DIFFICULTY, MAX_DIFFICULTY
            )));
        }
        if self.success_count > self.review_count {
            return Err(ReviewError::InvalidState(format!(
                "card {}: success_count {} exceeds review_count {}",
                self.id, self.success_count, self.review_count
            )));
        }
        if let (Some(due), Some(reviewed)) = (self.next_due, self.last_reviewed) {
            if due < reviewed {
                return Err(ReviewError::InvalidState(format!(
                    "card {}: next_due {} precedes last_reviewed {}",
                    self.id, due, reviewed
                )));
            }
        }
        Ok(())
    }
}
