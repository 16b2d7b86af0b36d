//! Chatbot settings updates
//!
//! Request payloads are decoded once into [`UpdateSettingsRequest`], merged
//! onto the stored settings, normalized and written back.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ChatbotError, Result};
use crate::models::{AiProvider, ApiKey, ChatbotSettings};
use crate::store::SettingsStore;

/// Settings update payload; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    pub ai_enabled: Option<bool>,
    pub ai_provider: Option<String>,
    pub ai_api_key: Option<String>,
    pub ai_server_url: Option<String>,
    pub ai_model: Option<String>,
    pub ai_system_prompt: Option<String>,
    pub ai_max_tokens: Option<u32>,
    pub fallback_message: Option<String>,
}

impl UpdateSettingsRequest {
    /// Decode a raw JSON body, reporting type mismatches as validation errors
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| ChatbotError::Validation(format!("invalid settings payload: {}", e)))
    }

    /// Explicit non-empty API key from the payload
    fn explicit_api_key(&self) -> Option<&str> {
        self.ai_api_key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Reads and writes per-organization chatbot settings
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Stored settings, or defaults when the organization has none yet
    pub async fn get_settings(&self, organization_id: Uuid) -> Result<ChatbotSettings> {
        Ok(self
            .store
            .get_settings(organization_id)
            .await?
            .unwrap_or_else(|| ChatbotSettings::new(organization_id)))
    }

    /// Validate `request`, merge it onto the current settings and persist.
    ///
    /// Nothing is written when validation fails.
    pub async fn update_settings(
        &self,
        organization_id: Uuid,
        request: UpdateSettingsRequest,
    ) -> Result<ChatbotSettings> {
        let current = self.get_settings(organization_id).await?;
        let settings = apply_update(current, &request)?;

        self.store.upsert_settings(&settings).await?;
        info!(
            "Updated chatbot settings for organization {} (provider={}, enabled={})",
            organization_id, settings.ai.provider, settings.ai.enabled
        );

        Ok(settings)
    }
}

/// Merge `request` onto `settings`, applying provider defaults
fn apply_update(
    mut settings: ChatbotSettings,
    request: &UpdateSettingsRequest,
) -> Result<ChatbotSettings> {
    let provider = match request.ai_provider.as_deref() {
        Some(raw) => raw.parse::<AiProvider>()?,
        None => settings.ai.provider,
    };

    // Endpoint, model and credential belong to the previous provider
    if provider != settings.ai.provider {
        debug!(
            "Switching provider {} -> {}, resetting endpoint, model and API key",
            settings.ai.provider, provider
        );
        settings.ai.server_url = provider.default_server_url().unwrap_or_default().to_string();
        settings.ai.model.clear();
        settings.ai.api_key = ApiKey::Unset;
    }

    if let Some(url) = request.ai_server_url.as_deref() {
        let url = url.trim();
        if !url.is_empty() {
            validate_server_url(url)?;
        }
        settings.ai.server_url = url.to_string();
    }

    if let Some(max_tokens) = request.ai_max_tokens {
        if max_tokens == 0 {
            return Err(ChatbotError::Validation(
                "ai_max_tokens must be greater than zero".to_string(),
            ));
        }
        settings.ai.max_tokens = max_tokens;
    }

    if let Some(enabled) = request.ai_enabled {
        settings.ai.enabled = enabled;
    }
    if let Some(model) = request.ai_model.as_deref() {
        settings.ai.model = model.trim().to_string();
    }
    if let Some(prompt) = request.ai_system_prompt.as_deref() {
        settings.ai.system_prompt = Some(prompt.to_string()).filter(|p| !p.trim().is_empty());
    }
    if let Some(fallback) = request.fallback_message.as_deref() {
        if !fallback.trim().is_empty() {
            settings.fallback_message = fallback.to_string();
        }
    }

    settings.ai.provider = provider;
    settings.ai.api_key = match request.explicit_api_key() {
        Some(key) => ApiKey::Explicit(key.to_string()),
        None if !provider.requires_api_key() => ApiKey::NoKey,
        None => std::mem::take(&mut settings.ai.api_key),
    };

    if settings.ai.server_url.is_empty() {
        if let Some(default_url) = provider.default_server_url() {
            debug!("Using default {} server URL {}", provider.display_name(), default_url);
            settings.ai.server_url = default_url.to_string();
        }
    }

    settings.updated_at = Utc::now();
    Ok(settings)
}

fn validate_server_url(raw: &str) -> Result<()> {
    let url = url::Url::parse(raw)
        .map_err(|e| ChatbotError::Validation(format!("invalid ai_server_url {:?}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        _ => Err(ChatbotError::Validation(format!(
            "ai_server_url must be an http(s) URL: {:?}",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use serde_json::json;

    const RASA_URL: &str = "http://localhost:5005/webhooks/rest/webhook";

    fn service() -> (SettingsService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        (SettingsService::new(store.clone()), store)
    }

    async fn update(
        service: &SettingsService,
        org: Uuid,
        payload: serde_json::Value,
    ) -> Result<ChatbotSettings> {
        let request = UpdateSettingsRequest::from_json(payload)?;
        service.update_settings(org, request).await
    }

    #[tokio::test]
    async fn test_rasa_provider_sets_default_api_key() {
        let (service, store) = service();
        let org = Uuid::new_v4();

        update(
            &service,
            org,
            json!({
                "ai_enabled": true,
                "ai_provider": "rasa",
                "ai_server_url": RASA_URL
            }),
        )
        .await
        .unwrap();

        let settings = store.get_settings(org).await.unwrap().unwrap();
        assert_eq!(settings.ai.provider, AiProvider::Rasa);
        assert_eq!(settings.ai.api_key.as_str(), "NO-KEY");
        assert_eq!(settings.ai.server_url, RASA_URL);
        assert!(settings.ai.enabled);
    }

    #[tokio::test]
    async fn test_rasa_provider_preserves_explicit_api_key() {
        let (service, store) = service();
        let org = Uuid::new_v4();

        update(
            &service,
            org,
            json!({
                "ai_enabled": true,
                "ai_provider": "rasa",
                "ai_api_key": "my-custom-rasa-token",
                "ai_server_url": RASA_URL
            }),
        )
        .await
        .unwrap();

        let settings = store.get_settings(org).await.unwrap().unwrap();
        assert_eq!(settings.ai.provider, AiProvider::Rasa);
        assert_eq!(settings.ai.api_key.as_str(), "my-custom-rasa-token");
    }

    #[tokio::test]
    async fn test_rasa_empty_key_still_gets_sentinel() {
        let (service, store) = service();
        let org = Uuid::new_v4();

        update(
            &service,
            org,
            json!({"ai_provider": "rasa", "ai_api_key": "", "ai_server_url": "http://h/webhook"}),
        )
        .await
        .unwrap();

        let settings = store.get_settings(org).await.unwrap().unwrap();
        assert_eq!(settings.ai.api_key.as_str(), "NO-KEY");
    }

    #[tokio::test]
    async fn test_unknown_provider_is_rejected_and_not_persisted() {
        let (service, store) = service();
        let org = Uuid::new_v4();

        let err = update(&service, org, json!({"ai_provider": "dialogflow"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatbotError::Validation(_)));
        assert!(store.get_settings(org).await.unwrap().is_none());
    }

    #[test]
    fn test_wrongly_typed_payload_is_validation_error() {
        let err = UpdateSettingsRequest::from_json(json!({"ai_enabled": "yes"})).unwrap_err();
        assert!(matches!(err, ChatbotError::Validation(_)));
    }

    #[tokio::test]
    async fn test_invalid_server_url_is_rejected() {
        let (service, _) = service();
        let org = Uuid::new_v4();

        for url in ["localhost:5005", "ftp://example.com/webhook", "not a url"] {
            let err = update(&service, org, json!({"ai_provider": "rasa", "ai_server_url": url}))
                .await
                .unwrap_err();
            assert!(matches!(err, ChatbotError::Validation(_)), "accepted {:?}", url);
        }
    }

    #[tokio::test]
    async fn test_cloud_provider_defaults_and_key_retention() {
        let (service, _) = service();
        let org = Uuid::new_v4();

        let settings = update(
            &service,
            org,
            json!({"ai_enabled": true, "ai_provider": "openai", "ai_api_key": "sk-test"}),
        )
        .await
        .unwrap();
        assert_eq!(settings.ai.server_url, "https://api.openai.com/v1");
        assert_eq!(settings.ai.api_key.bearer(), Some("sk-test"));

        // A later update without a key keeps the stored credential
        let settings = update(&service, org, json!({"ai_model": "gpt-4.1"}))
            .await
            .unwrap();
        assert_eq!(settings.ai.api_key.bearer(), Some("sk-test"));
        assert_eq!(settings.ai.model, "gpt-4.1");
        assert!(settings.ai.enabled);
    }

    #[tokio::test]
    async fn test_provider_switch_drops_previous_endpoint_and_key() {
        let (service, store) = service();
        let org = Uuid::new_v4();

        update(
            &service,
            org,
            json!({
                "ai_enabled": true,
                "ai_provider": "openai",
                "ai_api_key": "sk-openai-secret",
                "ai_model": "gpt-4.1"
            }),
        )
        .await
        .unwrap();

        let settings = update(&service, org, json!({"ai_provider": "anthropic"}))
            .await
            .unwrap();
        assert_eq!(settings.ai.provider, AiProvider::Anthropic);
        assert_eq!(settings.ai.server_url, "https://api.anthropic.com/v1");
        assert_eq!(settings.ai.api_key, ApiKey::Unset);
        assert_eq!(settings.ai.api_key.bearer(), None);
        assert_eq!(settings.ai.model, "");
        assert_eq!(settings.ai.effective_model(), "claude-sonnet-4-20250514");

        update(&service, org, json!({"ai_provider": "rasa"}))
            .await
            .unwrap();
        let settings = store.get_settings(org).await.unwrap().unwrap();
        assert_eq!(settings.ai.provider, AiProvider::Rasa);
        assert_eq!(settings.ai.server_url, "");
        assert_eq!(settings.ai.api_key.as_str(), "NO-KEY");
        assert!(settings.ai.enabled);
    }

    #[tokio::test]
    async fn test_provider_switch_uses_payload_url_and_key() {
        let (service, _) = service();
        let org = Uuid::new_v4();

        update(
            &service,
            org,
            json!({"ai_provider": "openai", "ai_api_key": "sk-openai-secret"}),
        )
        .await
        .unwrap();

        let settings = update(
            &service,
            org,
            json!({
                "ai_provider": "anthropic",
                "ai_api_key": "sk-ant-secret",
                "ai_server_url": "https://proxy.example.com/v1"
            }),
        )
        .await
        .unwrap();
        assert_eq!(settings.ai.server_url, "https://proxy.example.com/v1");
        assert_eq!(settings.ai.api_key.bearer(), Some("sk-ant-secret"));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (service, _) = service();
        let org = Uuid::new_v4();

        update(
            &service,
            org,
            json!({
                "ai_enabled": true,
                "ai_provider": "rasa",
                "ai_server_url": RASA_URL,
                "fallback_message": "We'll get back to you."
            }),
        )
        .await
        .unwrap();

        let settings = update(&service, org, json!({"ai_enabled": false}))
            .await
            .unwrap();
        assert!(!settings.ai.enabled);
        assert_eq!(settings.ai.server_url, RASA_URL);
        assert_eq!(settings.fallback_message, "We'll get back to you.");
        assert_eq!(settings.ai.api_key, ApiKey::NoKey);
    }

    #[tokio::test]
    async fn test_zero_max_tokens_rejected() {
        let (service, _) = service();
        let err = update(&service, Uuid::new_v4(), json!({"ai_max_tokens": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatbotError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_settings_defaults() {
        let (service, _) = service();
        let org = Uuid::new_v4();

        let settings = service.get_settings(org).await.unwrap();
        assert_eq!(settings.organization_id, org);
        assert!(!settings.ai.enabled);
        assert_eq!(settings.ai.api_key, ApiKey::Unset);
    }
}
