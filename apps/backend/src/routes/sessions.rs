//! Review session endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use review_core::ReviewSession;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::routes::owner::Owner;
use crate::AppState;

fn snapshot(session_id: Uuid, session: &ReviewSession) -> SessionResponse {
    let phase = session.phase();
    SessionResponse {
        session_id,
        phase,
        card: session
            .current()
            .zip(phase)
            .map(|(card, phase)| PresentedCard::new(card, phase)),
        remaining: session.remaining(),
        finished: session.is_finished(),
        summary: session.summary(),
    }
}

/// Drop a session from the registry once its queue is exhausted. The caller
/// still gets the final snapshot.
fn release_if_finished(
    state: &AppState,
    owner: &Owner,
    session_id: Uuid,
    session: &ReviewSession,
) {
    if session.is_finished() && state.sessions.remove(owner.id, session_id).is_ok() {
        tracing::info!(
            session_id = %session_id,
            graded = session.summary().graded,
            "session finished"
        );
    }
}

/// POST /api/sessions
pub async fn start(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let limit = match payload.limit {
        Some(0) | None => state.config.review_batch_size,
        Some(limit) => limit,
    };
    let session =
        ReviewSession::start(state.store.clone(), state.clock.clone(), owner.id, limit).await?;

    let (id, shared) = state.sessions.insert(session);
    let session = shared.lock().await;

    tracing::info!(session_id = %id, owner = %owner.id, queued = session.remaining(), "session started");
    release_if_finished(&state, &owner, id, &session);

    Ok((StatusCode::CREATED, Json(snapshot(id, &session))))
}

/// GET /api/sessions/{id}
pub async fn show(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let shared = state.sessions.get(owner.id, id)?;
    let session = shared.lock().await;
    Ok(Json(snapshot(id, &session)))
}

/// POST /api/sessions/{id}/reveal
pub async fn reveal(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let shared = state.sessions.get(owner.id, id)?;
    let mut session = shared.lock().await;
    session.reveal()?;
    Ok(Json(snapshot(id, &session)))
}

/// POST /api/sessions/{id}/grade
pub async fn grade(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<GradeResponse>> {
    let shared = state.sessions.get(owner.id, id)?;
    let mut session = shared.lock().await;
    let graded = session.grade_current(payload.success).await?;
    release_if_finished(&state, &owner, id, &session);

    Ok(Json(GradeResponse {
        graded,
        session: snapshot(id, &session),
    }))
}

/// POST /api/sessions/{id}/skip
pub async fn skip(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let shared = state.sessions.get(owner.id, id)?;
    let mut session = shared.lock().await;
    session.skip_current()?;
    release_if_finished(&state, &owner, id, &session);
    Ok(Json(snapshot(id, &session)))
}

/// POST /api/sessions/{id}/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let shared = state.sessions.get(owner.id, id)?;
    let mut session = shared.lock().await;
    session.refresh_current().await?;
    Ok(Json(snapshot(id, &session)))
}

/// DELETE /api/sessions/{id}
pub async fn abandon(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    let shared = state.sessions.remove(owner.id, id)?;
    let mut session = shared.lock().await;
    let summary = session.abandon();

    tracing::info!(
        session_id = %id,
        graded = summary.graded,
        abandoned = summary.abandoned,
        "session ended"
    );

    Ok(Json(summary))
}
