//! Test fixtures and factory functions for creating request bodies.

use serde_json::{json, Value};

/// Body for POST /api/cards.
pub fn create_card_request(front: &str, back: &str) -> Value {
    json!({
        "front": front,
        "back": back,
        "tags": ["test"],
    })
}

/// Body for POST /api/cards/{id}/review.
pub fn review_request(success: bool, expected_version: u64) -> Value {
    json!({
        "success": success,
        "expected_version": expected_version,
    })
}

/// Body for POST /api/sessions.
pub fn start_session_request(limit: Option<usize>) -> Value {
    match limit {
        Some(limit) => json!({ "limit": limit }),
        None => json!({}),
    }
}

/// Body for POST /api/sessions/{id}/grade.
pub fn grade_request(success: bool) -> Value {
    json!({ "success": success })
}
