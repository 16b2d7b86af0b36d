//! Rasa REST channel client

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{AiConfig, AiProvider, ChatbotSession};

use super::{BotProvider, ProviderMessage, decode_response, join_texts, transport_error};

/// Body of a Rasa `rest` webhook call
#[derive(Debug, Serialize)]
struct RasaRequest<'a> {
    sender: &'a str,
    message: &'a str,
}

/// Talks to a self-hosted Rasa server through its REST webhook
///
/// `server_url` is the full webhook URL, e.g.
/// `http://localhost:5005/webhooks/rest/webhook`.
#[derive(Debug, Clone)]
pub struct RasaProvider {
    client: Client,
}

impl RasaProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BotProvider for RasaProvider {
    fn kind(&self) -> AiProvider {
        AiProvider::Rasa
    }

    async fn send_turn(
        &self,
        ai: &AiConfig,
        session: &ChatbotSession,
        text: &str,
    ) -> Result<String> {
        let url = ai.server_url.trim();
        debug!("Sending message from {} to Rasa: {}", session.phone_number, url);

        let mut request = self.client.post(url).json(&RasaRequest {
            sender: &session.phone_number,
            message: text,
        });
        if let Some(key) = ai.api_key.bearer() {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(AiProvider::Rasa, e))?;

        let messages: Vec<ProviderMessage> = decode_response(AiProvider::Rasa, response).await?;
        debug!("Rasa returned {} message(s)", messages.len());

        join_texts(AiProvider::Rasa, messages.into_iter().map(|m| m.text))
    }
}
