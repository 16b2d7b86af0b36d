//! Chatbot turn processing
//!
//! Runs one inbound message through the organization's AI provider:
//! settings lookup, session get-or-create, provider call, session update.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ChatbotError, Result};
use crate::models::ChatbotSession;
use crate::provider::ProviderClient;
use crate::store::{SessionStore, SettingsStore};

/// Reply produced for one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReply {
    pub session_id: Uuid,
    pub reply: String,
    /// The provider answered without usable text and the fallback message was used
    pub fallback: bool,
}

/// Result of handling one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Reply(TurnReply),
    /// AI replies are switched off (or never configured) for the organization
    Disabled,
}

/// Handles inbound chat turns for all organizations
#[derive(Clone)]
pub struct ChatbotProcessor {
    settings: Arc<dyn SettingsStore>,
    sessions: Arc<dyn SessionStore>,
    provider: ProviderClient,
}

impl ChatbotProcessor {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        sessions: Arc<dyn SessionStore>,
        provider: ProviderClient,
    ) -> Self {
        Self {
            settings,
            sessions,
            provider,
        }
    }

    pub async fn handle_turn(
        &self,
        organization_id: Uuid,
        phone_number: &str,
        text: &str,
    ) -> Result<TurnOutcome> {
        self.handle_turn_with_cancel(organization_id, phone_number, text, &CancellationToken::new())
            .await
    }

    /// Handle one turn; `cancel` aborts the outbound provider call.
    ///
    /// Empty or text-less provider replies are answered with the
    /// organization's fallback message. Every other provider failure is
    /// returned to the caller and leaves the session untouched.
    pub async fn handle_turn_with_cancel(
        &self,
        organization_id: Uuid,
        phone_number: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let phone_number = phone_number.trim();
        if phone_number.is_empty() {
            return Err(ChatbotError::Validation("phone_number must not be empty".to_string()));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatbotError::Validation("message must not be empty".to_string()));
        }

        let settings = match self.settings.get_settings(organization_id).await? {
            Some(settings) if settings.ai.enabled => settings,
            _ => {
                debug!("AI replies disabled for organization {}", organization_id);
                return Ok(TurnOutcome::Disabled);
            }
        };

        let session = self
            .sessions
            .get_or_create_session(organization_id, phone_number)
            .await?;

        let (reply, fallback) = match self
            .provider
            .generate_response_with_cancel(&settings, &session, text, cancel)
            .await
        {
            Ok(reply) => (reply, false),
            Err(e) if e.is_soft_failure() => {
                warn!(
                    "Unusable reply for {} ({}), sending fallback message",
                    phone_number, e
                );
                (settings.fallback_message.clone(), true)
            }
            Err(e) => return Err(e),
        };

        let session = self.sessions.record_turn(session.id).await?;

        info!(
            "Handled turn {} of session {} for {}",
            session.turn_count, session.id, phone_number
        );

        Ok(TurnOutcome::Reply(TurnReply {
            session_id: session.id,
            reply,
            fallback,
        }))
    }

    /// Current session of a contact
    pub async fn get_session(
        &self,
        organization_id: Uuid,
        phone_number: &str,
    ) -> Result<ChatbotSession> {
        self.sessions
            .get_session(organization_id, phone_number)
            .await?
            .ok_or_else(|| ChatbotError::SessionNotFound(phone_number.to_string()))
    }
}
