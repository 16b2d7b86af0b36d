//! Anthropic Messages API client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatbotError, Result};
use crate::models::{AiConfig, AiProvider, ChatbotSession};

use super::{BotProvider, ProviderMessage, decode_response, endpoint, join_texts, transport_error};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<UserMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Content blocks share the `text` field with Rasa messages; tool_use and
/// other block types simply carry none.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ProviderMessage>,
}

/// Talks to the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
}

impl AnthropicProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BotProvider for AnthropicProvider {
    fn kind(&self) -> AiProvider {
        AiProvider::Anthropic
    }

    async fn send_turn(
        &self,
        ai: &AiConfig,
        session: &ChatbotSession,
        text: &str,
    ) -> Result<String> {
        let api_key = ai
            .api_key
            .bearer()
            .ok_or_else(|| ChatbotError::Configuration("API key is not configured".to_string()))?;

        let url = endpoint(&ai.server_url, "messages");
        debug!(
            "Sending request to Anthropic API for {}: {}",
            session.phone_number, url
        );

        let request = MessagesRequest {
            model: ai.effective_model(),
            max_tokens: ai.max_tokens,
            system: ai.system_prompt.as_deref().filter(|s| !s.is_empty()),
            messages: vec![UserMessage {
                role: "user",
                content: text,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(AiProvider::Anthropic, e))?;

        let parsed: MessagesResponse = decode_response(AiProvider::Anthropic, response).await?;

        join_texts(
            AiProvider::Anthropic,
            parsed.content.into_iter().map(|block| block.text),
        )
    }
}
