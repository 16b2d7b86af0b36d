//! OpenAI-compatible chat completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatbotError, Result};
use crate::models::{AiConfig, AiProvider, ChatbotSession};

use super::{BotProvider, decode_response, endpoint, join_texts, transport_error};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    /// End-user identifier forwarded for abuse monitoring
    user: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Talks to any OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
}

impl OpenAiProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BotProvider for OpenAiProvider {
    fn kind(&self) -> AiProvider {
        AiProvider::OpenAi
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

        let url = endpoint(&ai.server_url, "chat/completions");
        debug!("Sending request to OpenAI-compatible API: {}", url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = ai.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: text,
        });

        let request = ChatCompletionRequest {
            model: ai.effective_model(),
            messages,
            max_tokens: ai.max_tokens,
            user: &session.phone_number,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(AiProvider::OpenAi, e))?;

        let parsed: ChatCompletionResponse = decode_response(AiProvider::OpenAi, response).await?;

        join_texts(
            AiProvider::OpenAi,
            parsed.choices.into_iter().map(|c| c.message.content),
        )
    }
}
