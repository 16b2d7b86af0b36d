//! Middleware modules
//!
//! Contains authentication middleware and the organization extractor.

pub mod auth;

pub use auth::{OrganizationId, auth_middleware};
