//! Provider dispatch
//!
//! Selects the [`BotProvider`] registered for the organization's
//! `AiProvider` and runs one turn through it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ChatbotError, Result};
use crate::models::{AiProvider, ChatbotSession, ChatbotSettings};

use super::{AnthropicProvider, BotProvider, OpenAiProvider, RasaProvider};

/// Entry point for generating replies from the configured provider
#[derive(Clone, Default)]
pub struct ProviderClient {
    providers: HashMap<AiProvider, Arc<dyn BotProvider>>,
}

impl ProviderClient {
    /// Client with every built-in provider, sharing one HTTP client bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatbotError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let mut client = Self::empty();
        client.register(Arc::new(RasaProvider::new(http.clone())));
        client.register(Arc::new(OpenAiProvider::new(http.clone())));
        client.register(Arc::new(AnthropicProvider::new(http)));
        Ok(client)
    }

    /// Client with no providers registered
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a provider for its `kind()`, replacing any previous one
    pub fn register(&mut self, provider: Arc<dyn BotProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn supports(&self, provider: AiProvider) -> bool {
        self.providers.contains_key(&provider)
    }

    /// Forward `text` to the organization's provider and return the reply.
    ///
    /// Makes at most one outbound call; a missing server URL fails before
    /// any provider is touched.
    pub async fn generate_response(
        &self,
        settings: &ChatbotSettings,
        session: &ChatbotSession,
        text: &str,
    ) -> Result<String> {
        let ai = &settings.ai;

        if ai.server_url.trim().is_empty() {
            warn!(
                "{} server URL is not configured for organization {}",
                ai.provider.display_name(),
                settings.organization_id
            );
            return Err(ChatbotError::Configuration(
                "server URL is not configured".to_string(),
            ));
        }

        let provider = self.providers.get(&ai.provider).ok_or_else(|| {
            ChatbotError::Configuration(format!(
                "no client registered for provider {}",
                ai.provider
            ))
        })?;

        debug!(
            "Generating {} response for session {}",
            ai.provider.display_name(),
            session.id
        );
        let started = Instant::now();
        let result = provider.send_turn(ai, session, text).await;

        match &result {
            Ok(reply) => info!(
                "{} replied to {} in {:?} ({} chars)",
                ai.provider.display_name(),
                session.phone_number,
                started.elapsed(),
                reply.len()
            ),
            Err(e) => warn!(
                "{} call for {} failed after {:?}: {}",
                ai.provider.display_name(),
                session.phone_number,
                started.elapsed(),
                e
            ),
        }

        result
    }

    /// Same as [`generate_response`](Self::generate_response), aborted when `cancel` fires.
    ///
    /// Cancellation drops the in-flight request and reports a transport error.
    pub async fn generate_response_with_cancel(
        &self,
        settings: &ChatbotSettings,
        session: &ChatbotSession,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Provider call for {} cancelled", session.phone_number);
                Err(ChatbotError::transport(
                    settings.ai.provider.display_name(),
                    "request cancelled",
                ))
            }
            result = self.generate_response(settings, session, text) => result,
        }
    }
}
