//! Owner identification middleware
//!
//! Authentication happens upstream of this service. The caller forwards the
//! identity of the user it acts for in the `X-Owner-Id` header.

use axum::{extract::Request, middleware::Next, response::Response};
use review_core::OwnerId;
use uuid::Uuid;

use crate::error::{ApiError, Result};

pub const OWNER_HEADER: &str = "x-owner-id";

/// Owner of the request, stored in request extensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Owner {
    pub id: OwnerId,
}

/// Extracts the owner id from the `X-Owner-Id` header
pub async fn owner_middleware(mut request: Request, next: Next) -> Result<Response> {
    let value = request
        .headers()
        .get(OWNER_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing X-Owner-Id header".to_string()))?;

    let id = Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::Unauthorized("Invalid X-Owner-Id header".to_string()))?;

    request.extensions_mut().insert(Owner { id });

    Ok(next.run(request).await)
}
