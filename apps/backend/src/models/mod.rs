//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Re-export shared types from review-core
pub use review_core::{Card, CardPhase, NewCard, SessionSummary, StoreError};

// === Database Entity Types ===

/// Card stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbCard {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub path_id: Option<Uuid>,
    pub front_text: String,
    pub back_text: String,
    pub tags: Vec<String>,
    pub difficulty: i16,
    pub review_count: i32,
    pub success_count: i32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_due: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl DbCard {
    /// Convert to review-core Card
    pub fn into_core_card(self) -> Result<Card, StoreError> {
        let invalid =
            |field: &str| StoreError::Backend(format!("card {}: {} out of range", self.id, field));
        Ok(Card {
            id: self.id,
            owner: self.owner_id,
            path_id: self.path_id,
            difficulty: u8::try_from(self.difficulty).map_err(|_| invalid("difficulty"))?,
            review_count: u32::try_from(self.review_count).map_err(|_| invalid("review_count"))?,
            success_count: u32::try_from(self.success_count)
                .map_err(|_| invalid("success_count"))?,
            version: u64::try_from(self.version).map_err(|_| invalid("version"))?,
            last_reviewed: self.last_reviewed,
            next_due: self.next_due,
            created_at: self.created_at,
            front: self.front_text,
            back: self.back_text,
            tags: self.tags,
        })
    }
}

// === API Request/Response Types ===

/// POST /api/cards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub path_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateCardRequest {
    pub fn into_new_card(self, owner: Uuid) -> NewCard {
        NewCard {
            owner,
            front: self.front,
            back: self.back,
            path_id: self.path_id,
            tags: self.tags,
        }
    }
}

/// GET /api/cards/due
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DueCardsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueCardsResponse {
    pub cards: Vec<Card>,
}

/// GET /api/cards/due/count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueCountResponse {
    pub due: usize,
}

/// POST /api/cards/{id}/review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCardRequest {
    pub success: bool,
    pub expected_version: u64,
}

/// POST /api/sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// POST /api/sessions/{id}/grade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    pub success: bool,
}

/// Card as shown during a session. The back is withheld until revealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentedCard {
    pub id: Uuid,
    pub front: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
    pub tags: Vec<String>,
    pub version: u64,
}

impl PresentedCard {
    pub fn new(card: &Card, phase: CardPhase) -> Self {
        Self {
            id: card.id,
            front: card.front.clone(),
            back: (phase == CardPhase::Revealed).then(|| card.back.clone()),
            tags: card.tags.clone(),
            version: card.version,
        }
    }
}

/// Snapshot of a review session returned by every session endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<CardPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<PresentedCard>,
    pub remaining: usize,
    pub finished: bool,
    pub summary: SessionSummary,
}

/// POST /api/sessions/{id}/grade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeResponse {
    pub graded: Card,
    pub session: SessionResponse,
}
