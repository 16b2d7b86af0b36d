//! wa-core: WhatsApp chatbot core library
//!
//! Per-organization chatbot settings, conversation sessions and the
//! outbound AI provider clients (Rasa, OpenAI-compatible, Anthropic)
//! that turn an inbound WhatsApp message into a reply.

pub mod config;
pub mod error;
pub mod models;
pub mod processor;
pub mod provider;
pub mod settings;
pub mod store;

pub use config::{ApiConfig, Config, DatabaseConfig, ProviderConfig};
pub use error::{ChatbotError, Result};
pub use models::{AiConfig, AiProvider, ApiKey, ChatbotSession, ChatbotSettings, SessionStatus};
pub use processor::{ChatbotProcessor, TurnOutcome, TurnReply};
pub use provider::{BotProvider, ProviderClient, ProviderMessage};
pub use settings::{SettingsService, UpdateSettingsRequest};
pub use store::{SessionStore, SettingsStore, SqliteStore};
