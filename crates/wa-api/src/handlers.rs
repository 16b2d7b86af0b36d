//! HTTP API handlers
//!
//! Chatbot settings, turn processing and session lookup.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use wa_core::{ChatbotSession, ChatbotSettings, TurnOutcome, UpdateSettingsRequest};

use crate::error::{ApiError, Result};
use crate::middleware::OrganizationId;
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Settings as exposed over HTTP; the API key itself is never returned
#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub organization_id: Uuid,
    pub ai_enabled: bool,
    pub ai_provider: String,
    pub ai_server_url: String,
    pub ai_api_key_set: bool,
    pub ai_model: String,
    pub ai_system_prompt: Option<String>,
    pub ai_max_tokens: u32,
    pub fallback_message: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&ChatbotSettings> for SettingsResponse {
    fn from(settings: &ChatbotSettings) -> Self {
        Self {
            organization_id: settings.organization_id,
            ai_enabled: settings.ai.enabled,
            ai_provider: settings.ai.provider.as_str().to_string(),
            ai_server_url: settings.ai.server_url.clone(),
            ai_api_key_set: settings.ai.api_key.is_set(),
            ai_model: settings.ai.model.clone(),
            ai_system_prompt: settings.ai.system_prompt.clone(),
            ai_max_tokens: settings.ai.max_tokens,
            fallback_message: settings.fallback_message.clone(),
            updated_at: settings.updated_at,
        }
    }
}

/// Turn request payload
#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    /// Contact phone number
    pub phone_number: String,
    /// Inbound message text
    pub message: String,
}

/// Turn response payload
#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    pub ai_enabled: bool,
    pub reply: Option<String>,
    pub session_id: Option<Uuid>,
    /// Reply is the organization's fallback message
    pub fallback: bool,
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Current chatbot settings of the caller's organization
pub async fn get_settings(
    State(state): State<AppState>,
    OrganizationId(organization_id): OrganizationId,
) -> Result<Json<SettingsResponse>> {
    debug!("Settings request for organization {}", organization_id);
    let settings = state.settings.get_settings(organization_id).await?;
    Ok(Json(SettingsResponse::from(&settings)))
}

/// Validate and store chatbot settings
pub async fn update_settings(
    State(state): State<AppState>,
    OrganizationId(organization_id): OrganizationId,
    body: Bytes,
) -> Result<Json<SettingsResponse>> {
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("body is not valid JSON: {}", e)))?;
    let request = UpdateSettingsRequest::from_json(payload)?;

    let settings = state
        .settings
        .update_settings(organization_id, request)
        .await?;
    Ok(Json(SettingsResponse::from(&settings)))
}

/// Run one inbound message through the organization's AI provider
pub async fn turn(
    State(state): State<AppState>,
    OrganizationId(organization_id): OrganizationId,
    body: Bytes,
) -> Result<Json<TurnResponse>> {
    let req: TurnRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid turn request: {}", e)))?;
    debug!("Turn request from {}", req.phone_number);

    let outcome = state
        .processor
        .handle_turn(organization_id, &req.phone_number, &req.message)
        .await?;

    let response = match outcome {
        TurnOutcome::Reply(reply) => {
            info!(
                "Turn reply for {} (session {}, fallback={})",
                req.phone_number, reply.session_id, reply.fallback
            );
            TurnResponse {
                ai_enabled: true,
                reply: Some(reply.reply),
                session_id: Some(reply.session_id),
                fallback: reply.fallback,
            }
        }
        TurnOutcome::Disabled => TurnResponse {
            ai_enabled: false,
            reply: None,
            session_id: None,
            fallback: false,
        },
    };

    Ok(Json(response))
}

/// Get session info
pub async fn session_info(
    State(state): State<AppState>,
    OrganizationId(organization_id): OrganizationId,
    Path(phone_number): Path<String>,
) -> Result<Json<ChatbotSession>> {
    let session = state
        .processor
        .get_session(organization_id, &phone_number)
        .await?;
    Ok(Json(session))
}
