//! Configuration structures.
//!
//! Configuration is loaded from environment variables; the binary may
//! override a few fields from its command line.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value shipped in sample `.env` files; treated the same as an unset key.
pub const API_KEY_PLACEHOLDER: &str = "INPUT_YOUR_API_KEY";

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server identity and transport.
    #[serde(default)]
    pub server: ServerConfig,

    /// Search provider settings.
    #[serde(default)]
    pub tavily: TavilyConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Build configuration from process environment, falling back to defaults.
    ///
    /// Recognised variables: `TAVILY_API_KEY`, `TAVILY_BASE_URL`,
    /// `TAVILY_MCP_LISTEN_ADDR`, `TAVILY_MCP_TRANSPORT`, `TAVILY_MCP_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(key) = lookup("TAVILY_API_KEY") {
            config.tavily.api_key = key;
        }
        if let Some(url) = lookup("TAVILY_BASE_URL") {
            config.tavily.base_url = url;
        }
        if let Some(addr) = lookup("TAVILY_MCP_LISTEN_ADDR") {
            config.server.listen_addr = addr;
        }
        if let Some(transport) = lookup("TAVILY_MCP_TRANSPORT").and_then(|v| Transport::parse(&v)) {
            config.server.transport = transport;
        }
        if let Some(format) = lookup("TAVILY_MCP_LOG_FORMAT") {
            config.observability.json_logs = format.eq_ignore_ascii_case("json");
        }

        config
    }
}

/// Transport the server is exposed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// JSON-RPC over HTTP POST plus the `/health` route.
    #[default]
    StreamableHttp,
    /// Newline-delimited JSON-RPC on stdin/stdout.
    Stdio,
}

impl Transport {
    /// Parse the names accepted on the command line and in the environment.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "http" | "streamable_http" | "streamable-http" => Some(Transport::StreamableHttp),
            "stdio" => Some(Transport::Stdio),
            _ => None,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name reported in `initialize` and in log records.
    pub name: String,

    /// Version reported in `initialize`.
    pub version: String,

    /// Free-form instructions reported in `initialize`.
    pub instructions: Option<String>,

    /// HTTP bind address.
    pub listen_addr: String,

    /// Route the JSON-RPC endpoint is mounted on.
    pub mcp_path: String,

    /// Transport selection.
    pub transport: Transport,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "tavily-search".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: Some(
                "Tavily Search Server provides search capabilities for web, news, and finance information."
                    .to_string(),
            ),
            listen_addr: "127.0.0.1:8000".to_string(),
            mcp_path: "/mcp/".to_string(),
            transport: Transport::StreamableHttp,
        }
    }
}

/// Search provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TavilyConfig {
    /// API key; the placeholder value means "unconfigured".
    pub api_key: String,

    /// Base URL of the search API (no trailing slash).
    pub base_url: String,

    /// Request timeout used when a call does not carry its own.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl TavilyConfig {
    /// Whether a real API key has been provided.
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != API_KEY_PLACEHOLDER
    }
}

impl Default for TavilyConfig {
    fn default() -> Self {
        Self {
            api_key: API_KEY_PLACEHOLDER.to_string(),
            base_url: "https://api.tavily.com".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
