//! SQLite-backed settings and session persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ChatbotError, Result};
use crate::models::{AiConfig, AiProvider, ApiKey, ChatbotSession, ChatbotSettings, SessionStatus};

use super::{SessionStore, SettingsStore};

const SETTINGS_COLUMNS: &str = "organization_id, ai_enabled, ai_provider, ai_server_url, ai_api_key, \
     ai_model, ai_system_prompt, ai_max_tokens, fallback_message, created_at, updated_at";

const SESSION_COLUMNS: &str =
    "id, organization_id, phone_number, status, turn_count, created_at, updated_at";

/// SQLite store for chatbot settings and sessions
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path
    pub fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn init_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chatbot_settings (
            organization_id TEXT PRIMARY KEY,
            ai_enabled INTEGER NOT NULL DEFAULT 0,
            ai_provider TEXT NOT NULL,
            ai_server_url TEXT NOT NULL DEFAULT '',
            ai_api_key TEXT NOT NULL DEFAULT '',
            ai_model TEXT NOT NULL DEFAULT '',
            ai_system_prompt TEXT,
            ai_max_tokens INTEGER NOT NULL,
            fallback_message TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS chatbot_sessions (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            phone_number TEXT NOT NULL,
            status TEXT NOT NULL,
            turn_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (organization_id, phone_number)
        );",
    )?;
    Ok(())
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn settings_from_row(row: &Row<'_>) -> rusqlite::Result<ChatbotSettings> {
    let provider: String = row.get(2)?;
    let provider = provider
        .parse::<AiProvider>()
        .map_err(|e| conversion_error(2, e))?;
    let api_key: String = row.get(4)?;

    Ok(ChatbotSettings {
        organization_id: uuid_column(row, 0)?,
        ai: AiConfig {
            enabled: row.get(1)?,
            provider,
            server_url: row.get(3)?,
            api_key: ApiKey::from(api_key),
            model: row.get(5)?,
            system_prompt: row.get(6)?,
            max_tokens: row.get(7)?,
        },
        fallback_message: row.get(8)?,
        created_at: timestamp_column(row, 9)?,
        updated_at: timestamp_column(row, 10)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ChatbotSession> {
    let status: String = row.get(3)?;
    let status = status
        .parse::<SessionStatus>()
        .map_err(|e| conversion_error(3, e))?;

    Ok(ChatbotSession {
        id: uuid_column(row, 0)?,
        organization_id: uuid_column(row, 1)?,
        phone_number: row.get(2)?,
        status,
        turn_count: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get_settings(&self, organization_id: Uuid) -> Result<Option<ChatbotSettings>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM chatbot_settings WHERE organization_id = ?1",
            SETTINGS_COLUMNS
        );
        let settings = conn
            .query_row(&sql, params![organization_id.to_string()], settings_from_row)
            .optional()?;
        Ok(settings)
    }

    async fn upsert_settings(&self, settings: &ChatbotSettings) -> Result<()> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "INSERT INTO chatbot_settings ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(organization_id) DO UPDATE SET
                ai_enabled = excluded.ai_enabled,
                ai_provider = excluded.ai_provider,
                ai_server_url = excluded.ai_server_url,
                ai_api_key = excluded.ai_api_key,
                ai_model = excluded.ai_model,
                ai_system_prompt = excluded.ai_system_prompt,
                ai_max_tokens = excluded.ai_max_tokens,
                fallback_message = excluded.fallback_message,
                updated_at = excluded.updated_at",
            SETTINGS_COLUMNS
        );
        conn.execute(
            &sql,
            params![
                settings.organization_id.to_string(),
                settings.ai.enabled,
                settings.ai.provider.as_str(),
                settings.ai.server_url,
                settings.ai.api_key.as_str(),
                settings.ai.model,
                settings.ai.system_prompt,
                settings.ai.max_tokens,
                settings.fallback_message,
                settings.created_at.to_rfc3339(),
                settings.updated_at.to_rfc3339(),
            ],
        )?;
        debug!("Saved chatbot settings for organization {}", settings.organization_id);
        Ok(())
    }
}

fn select_session(
    conn: &Connection,
    organization_id: Uuid,
    phone_number: &str,
) -> Result<Option<ChatbotSession>> {
    let sql = format!(
        "SELECT {} FROM chatbot_sessions WHERE organization_id = ?1 AND phone_number = ?2",
        SESSION_COLUMNS
    );
    let session = conn
        .query_row(
            &sql,
            params![organization_id.to_string(), phone_number],
            session_from_row,
        )
        .optional()?;
    Ok(session)
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn get_session(
        &self,
        organization_id: Uuid,
        phone_number: &str,
    ) -> Result<Option<ChatbotSession>> {
        let conn = self.conn.lock().await;
        select_session(&conn, organization_id, phone_number)
    }

    async fn get_or_create_session(
        &self,
        organization_id: Uuid,
        phone_number: &str,
    ) -> Result<ChatbotSession> {
        let conn = self.conn.lock().await;
        let candidate = ChatbotSession::new(organization_id, phone_number);
        let sql = format!(
            "INSERT INTO chatbot_sessions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(organization_id, phone_number) DO NOTHING",
            SESSION_COLUMNS
        );
        let inserted = conn.execute(
            &sql,
            params![
                candidate.id.to_string(),
                candidate.organization_id.to_string(),
                candidate.phone_number,
                candidate.status.as_str(),
                candidate.turn_count,
                candidate.created_at.to_rfc3339(),
                candidate.updated_at.to_rfc3339(),
            ],
        )?;
        if inserted > 0 {
            debug!("Created chatbot session {} for {}", candidate.id, phone_number);
        }

        select_session(&conn, organization_id, phone_number)?.ok_or_else(|| {
            ChatbotError::Store(format!("session for {} vanished after insert", phone_number))
        })
    }

    async fn record_turn(&self, session_id: Uuid) -> Result<ChatbotSession> {
        let conn = self.conn.lock().await;
        let affected = conn.execute(
            "UPDATE chatbot_sessions
             SET turn_count = turn_count + 1, status = ?2, updated_at = ?3
             WHERE id = ?1",
            params![
                session_id.to_string(),
                SessionStatus::Active.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(ChatbotError::SessionNotFound(session_id.to_string()));
        }

        let sql = format!("SELECT {} FROM chatbot_sessions WHERE id = ?1", SESSION_COLUMNS);
        let session = conn.query_row(&sql, params![session_id.to_string()], session_from_row)?;
        Ok(session)
    }
}
