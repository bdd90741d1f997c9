//! Core types for the search tool server.
//!
//! This module provides foundational types used throughout the crate:
//! - **IDs**: Strongly-typed identifiers (RequestId, SessionId, ClientId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for server, provider, and logging

mod config;
mod errors;
mod ids;

pub use config::{
    Config, ObservabilityConfig, ServerConfig, TavilyConfig, Transport, API_KEY_PLACEHOLDER,
};
pub use errors::{codes, Error, Result};
pub use ids::{ClientId, RequestId, SessionId};
