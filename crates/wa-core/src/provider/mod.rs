//! Outbound bot providers
//!
//! A [`BotProvider`] forwards one user turn to a conversational-AI backend
//! and returns a single deliverable reply. Every provider family decodes
//! its reply into an ordered list of [`ProviderMessage`]s and shares the
//! same normalization: empty list, no text, or the texts joined by a blank
//! line.

mod anthropic;
mod client;
mod openai;
mod rasa;

pub use anthropic::AnthropicProvider;
pub use client::ProviderClient;
pub use openai::OpenAiProvider;
pub use rasa::RasaProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::error::{ChatbotError, Result};
use crate::models::{AiConfig, AiProvider, ChatbotSession};

/// Separator placed between consecutive reply texts
pub const REPLY_SEPARATOR: &str = "\n\n";

/// Longest provider error body kept in a `ChatbotError::Provider`
pub const MAX_ERROR_BODY_CHARS: usize = 2048;

/// A provider that can answer one conversation turn
#[async_trait]
pub trait BotProvider: Send + Sync {
    /// Provider family this implementation serves
    fn kind(&self) -> AiProvider;

    /// Send `text` from `session`'s contact and return the normalized reply.
    ///
    /// Called only with a non-empty `ai.server_url`.
    async fn send_turn(&self, ai: &AiConfig, session: &ChatbotSession, text: &str)
    -> Result<String>;
}

/// One unit of a provider reply
///
/// Only `text` matters here; images, buttons and recipient ids are kept in
/// `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProviderMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            extra: serde_json::Map::new(),
        }
    }
}

/// Collapse a provider reply into one string.
///
/// Texts keep their original order; messages without text (absent or empty)
/// are dropped.
pub fn join_texts<I>(provider: AiProvider, texts: I) -> Result<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut received = 0usize;
    let texts: Vec<String> = texts
        .into_iter()
        .inspect(|_| received += 1)
        .flatten()
        .filter(|text| !text.is_empty())
        .collect();

    if received == 0 {
        return Err(ChatbotError::EmptyResponse {
            provider: provider.display_name().to_string(),
        });
    }
    if texts.is_empty() {
        return Err(ChatbotError::NoText {
            provider: provider.display_name().to_string(),
        });
    }

    Ok(texts.join(REPLY_SEPARATOR))
}

/// Shorten an error body to at most `MAX_ERROR_BODY_CHARS` characters
pub(crate) fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...(truncated)", &body[..idx]),
        None => body.to_string(),
    }
}

pub(crate) fn transport_error(provider: AiProvider, err: reqwest::Error) -> ChatbotError {
    let message = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    };
    ChatbotError::transport(provider.display_name(), message)
}

/// Check the status, then decode the body as `T`.
///
/// Non-success statuses become `ChatbotError::Provider`; an undecodable
/// success body is a transport failure.
pub(crate) async fn decode_response<T>(provider: AiProvider, response: reqwest::Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    if !status.is_success() {
        return Err(ChatbotError::Provider {
            provider: provider.display_name().to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        ChatbotError::transport(
            provider.display_name(),
            format!("failed to decode response: {} - {}", e, truncate_body(&body)),
        )
    })
}

/// `base` with `path` appended, without doubling the slash
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim().trim_end_matches('/'), path)
}
