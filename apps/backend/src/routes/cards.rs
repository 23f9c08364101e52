//! Card endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use review_core::{apply_grade, Card, ReviewError};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::owner::Owner;
use crate::AppState;

/// POST /api/cards
pub async fn create(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>)> {
    if payload.front.trim().is_empty() || payload.back.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "front and back must not be empty".to_string(),
        ));
    }

    let card = state.store.create(payload.into_new_card(owner.id)).await?;
    tracing::info!(card_id = %card.id, owner = %owner.id, "card created");

    Ok((StatusCode::CREATED, Json(card)))
}

/// GET /api/cards/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<Json<Card>> {
    let card = state.store.get(owner.id, id).await?;
    Ok(Json(card))
}

/// GET /api/cards/due
pub async fn due(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Query(query): Query<DueCardsQuery>,
) -> Result<Json<DueCardsResponse>> {
    // 0 means the configured batch size, as when starting a session.
    let limit = match query.limit {
        Some(0) | None => state.config.review_batch_size,
        Some(limit) => limit,
    };
    let now = state.clock.now();
    let cards = state.store.query_due(owner.id, now, limit).await?;

    Ok(Json(DueCardsResponse { cards }))
}

/// GET /api/cards/due/count
pub async fn due_count(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> Result<Json<DueCountResponse>> {
    let now = state.clock.now();
    let due = state.store.count_due(owner.id, now).await?;

    Ok(Json(DueCountResponse { due }))
}

/// POST /api/cards/{id}/review
///
/// Grades a card outside of a session. The client passes the version it last
/// saw; a stale version is rejected with 409.
pub async fn review(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewCardRequest>,
) -> Result<Json<Card>> {
    let card = state.store.get(owner.id, id).await?;
    if card.version != payload.expected_version {
        return Err(ReviewError::ConcurrentModification {
            id,
            expected: payload.expected_version,
        }
        .into());
    }

    let now = state.clock.now();
    let next = apply_grade(&card, payload.success, now)?;
    let stored = state
        .store
        .compare_and_swap(id, payload.expected_version, next)
        .await?;

    tracing::info!(
        card_id = %id,
        success = payload.success,
        difficulty = stored.difficulty,
        "card reviewed"
    );

    Ok(Json(stored))
}
