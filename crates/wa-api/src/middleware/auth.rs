//! Authentication middleware
//!
//! API key check for protected endpoints and the organization context
//! extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppState;

/// Header carrying the authenticated caller's organization
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// API key authentication middleware
///
/// When no key is configured every request is let through.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let api_key = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if !validate_api_key(api_key, state.config.api.key.as_deref()) {
        debug!("Rejected request to {}: bad API key", request.uri().path());
        return ApiError::AuthFailed.into_response();
    }

    next.run(request).await
}

/// Simple API key validation
pub fn validate_api_key(provided: Option<&str>, expected: Option<&str>) -> bool {
    match (provided, expected) {
        (Some(p), Some(e)) => p == e,
        (_, None) => true, // No key configured, allow
        (None, Some(_)) => false, // Key required but not provided
    }
}

/// Organization the request acts on, taken from `X-Organization-Id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizationId(pub Uuid);

impl<S> FromRequestParts<S> for OrganizationId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ORGANIZATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(OrganizationId)
            .ok_or(ApiError::MissingOrganization)
    }
}
