//! wa-api: HTTP API for the WhatsApp chatbot
//!
//! Provides REST endpoints for chatbot settings, turn processing and
//! session lookup. Built with axum for async HTTP handling.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{AppState, app, start_server};
