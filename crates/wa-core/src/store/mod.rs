//! Persistence seams for chatbot settings and sessions
//!
//! Services depend on these traits only; `SqliteStore` is the
//! implementation used by the gateway and the tests.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ChatbotSession, ChatbotSettings};

/// Per-organization chatbot settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Settings row of an organization, if one was ever saved
    async fn get_settings(&self, organization_id: Uuid) -> Result<Option<ChatbotSettings>>;

    /// Insert or replace the row keyed by `settings.organization_id`
    async fn upsert_settings(&self, settings: &ChatbotSettings) -> Result<()>;
}

/// Conversation sessions, unique per (organization, phone number)
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(
        &self,
        organization_id: Uuid,
        phone_number: &str,
    ) -> Result<Option<ChatbotSession>>;

    /// Session of a contact, created on first contact.
    ///
    /// Concurrent callers for the same contact all receive the same session.
    async fn get_or_create_session(
        &self,
        organization_id: Uuid,
        phone_number: &str,
    ) -> Result<ChatbotSession>;

    /// Count one completed turn and return the updated session
    async fn record_turn(&self, session_id: Uuid) -> Result<ChatbotSession>;
}
