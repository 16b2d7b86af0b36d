//! Chatbot domain types
//!
//! Per-organization chatbot settings, conversation sessions and the
//! provider identifiers stored in them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ChatbotError, Result};

/// Stored marker for "this provider is configured without a credential"
pub const NO_KEY_SENTINEL: &str = "NO-KEY";

/// Reply used when an organization has not configured its own fallback
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't process your message right now. Please try again later.";

fn default_max_tokens() -> u32 {
    1024
}

/// Conversational-AI backend family
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// Self-hosted Rasa REST webhook (no cloud API key required)
    #[default]
    Rasa,
    /// OpenAI-compatible chat completions API
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
}

impl AiProvider {
    pub const ALL: [AiProvider; 3] = [AiProvider::Rasa, AiProvider::OpenAi, AiProvider::Anthropic];

    /// Wire identifier used in payloads and the database
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Rasa => "rasa",
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
        }
    }

    /// Name used in error messages and logs
    pub fn display_name(&self) -> &'static str {
        match self {
            AiProvider::Rasa => "Rasa",
            AiProvider::OpenAi => "OpenAI",
            AiProvider::Anthropic => "Anthropic",
        }
    }

    /// Self-hosted providers run without an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, AiProvider::Rasa)
    }

    /// Public endpoint used when no server URL was configured
    pub fn default_server_url(&self) -> Option<&'static str> {
        match self {
            AiProvider::Rasa => None,
            AiProvider::OpenAi => Some("https://api.openai.com/v1"),
            AiProvider::Anthropic => Some("https://api.anthropic.com/v1"),
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::Rasa => "",
            AiProvider::OpenAi => "gpt-4o-mini",
            AiProvider::Anthropic => "claude-sonnet-4-20250514",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = ChatbotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rasa" => Ok(AiProvider::Rasa),
            "openai" => Ok(AiProvider::OpenAi),
            "anthropic" => Ok(AiProvider::Anthropic),
            other => Err(ChatbotError::Validation(format!(
                "unsupported AI provider: {:?} (expected one of: rasa, openai, anthropic)",
                other
            ))),
        }
    }
}

/// Stored provider credential
///
/// Serialized as a plain string: `""` is `Unset`, `"NO-KEY"` is `NoKey`,
/// anything else is `Explicit`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApiKey {
    #[default]
    Unset,
    /// Provider configured without requiring a credential
    NoKey,
    Explicit(String),
}

impl ApiKey {
    /// Stored representation
    pub fn as_str(&self) -> &str {
        match self {
            ApiKey::Unset => "",
            ApiKey::NoKey => NO_KEY_SENTINEL,
            ApiKey::Explicit(key) => key,
        }
    }

    /// Credential to send as `Authorization: Bearer ...`, if any
    pub fn bearer(&self) -> Option<&str> {
        match self {
            ApiKey::Explicit(key) if !key.is_empty() => Some(key),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        self.bearer().is_some()
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" => ApiKey::Unset,
            NO_KEY_SENTINEL => ApiKey::NoKey,
            _ => ApiKey::Explicit(value),
        }
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        ApiKey::from(value.to_string())
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        match key {
            ApiKey::Explicit(key) => key,
            other => other.as_str().to_string(),
        }
    }
}

/// AI provider configuration of one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    pub provider: AiProvider,
    /// Webhook (Rasa) or API base URL (cloud providers)
    pub server_url: String,
    pub api_key: ApiKey,
    /// Model name for cloud providers; empty means the provider default
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: AiProvider::default(),
            server_url: String::new(),
            api_key: ApiKey::Unset,
            model: String::new(),
            system_prompt: None,
            max_tokens: default_max_tokens(),
        }
    }
}

impl AiConfig {
    /// Configured model, or the provider default when none is set
    pub fn effective_model(&self) -> &str {
        if self.model.trim().is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }
}

/// Chatbot settings, one row per organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotSettings {
    pub organization_id: Uuid,
    pub ai: AiConfig,
    pub fallback_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatbotSettings {
    /// Default (disabled) settings for an organization
    pub fn new(organization_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            organization_id,
            ai: AiConfig::default(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle of a conversation session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Closed => "closed",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ChatbotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(ChatbotError::Store(format!("unknown session status: {}", other))),
        }
    }
}

/// One ongoing conversation with a WhatsApp contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotSession {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Contact phone number, also used as the provider-side sender id
    pub phone_number: String,
    pub status: SessionStatus,
    pub turn_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatbotSession {
    /// Create a new active session for a contact
    pub fn new(organization_id: Uuid, phone_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            phone_number: phone_number.into(),
            status: SessionStatus::Active,
            turn_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("rasa".parse::<AiProvider>().unwrap(), AiProvider::Rasa);
        assert_eq!(" OpenAI ".parse::<AiProvider>().unwrap(), AiProvider::OpenAi);
        assert_eq!("anthropic".parse::<AiProvider>().unwrap(), AiProvider::Anthropic);

        let err = "dialogflow".parse::<AiProvider>().unwrap_err();
        assert!(matches!(err, ChatbotError::Validation(_)));
    }

    #[test]
    fn test_provider_wire_names_round_trip_through_serde() {
        for provider in AiProvider::ALL {
            let json = serde_json::to_string(&provider).unwrap();
            assert_eq!(json, format!("\"{}\"", provider.as_str()));
        }
    }

    #[test]
    fn test_api_key_tri_state() {
        assert_eq!(ApiKey::from(""), ApiKey::Unset);
        assert_eq!(ApiKey::from("NO-KEY"), ApiKey::NoKey);
        assert_eq!(
            ApiKey::from("my-secret-token"),
            ApiKey::Explicit("my-secret-token".to_string())
        );

        assert_eq!(ApiKey::Unset.bearer(), None);
        assert_eq!(ApiKey::NoKey.bearer(), None);
        assert_eq!(ApiKey::from("my-secret-token").bearer(), Some("my-secret-token"));
    }

    #[test]
    fn test_api_key_serializes_as_plain_string() {
        let json = serde_json::to_string(&ApiKey::NoKey).unwrap();
        assert_eq!(json, "\"NO-KEY\"");

        let key: ApiKey = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(key, ApiKey::Explicit("abc".to_string()));
    }

    #[test]
    fn test_effective_model() {
        let mut ai = AiConfig {
            provider: AiProvider::OpenAi,
            ..AiConfig::default()
        };
        assert_eq!(ai.effective_model(), "gpt-4o-mini");

        ai.model = "gpt-4.1".to_string();
        assert_eq!(ai.effective_model(), "gpt-4.1");
    }

    #[test]
    fn test_new_session_is_active() {
        let session = ChatbotSession::new(Uuid::new_v4(), "1234567890");
        assert_eq!(session.turn_count, 0);
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.phone_number, "1234567890");
    }
}
