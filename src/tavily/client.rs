//! Tavily search API client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::params::SearchParams;
use crate::types::{Error, Result, TavilyConfig};

/// Outbound search collaborator used by the search tools.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, params: &SearchParams) -> Result<Value>;
}

/// HTTP client for `POST {base_url}/search`.
#[derive(Clone)]
pub struct TavilyClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    default_timeout: Duration,
}

impl fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilyClient")
            .field("base_url", &self.base_url)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl TavilyClient {
    /// Build the client. An unconfigured key only warns; calls fail later.
    pub fn new(config: &TavilyConfig) -> Result<Self> {
        let api_key = if config.is_configured() {
            Some(config.api_key.trim().to_string())
        } else {
            tracing::warn!("Tavily API Key is not set. Please set TAVILY_API_KEY in env.");
            None
        };

        let http = Client::builder()
            .user_agent(concat!("tavily-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_timeout: config.request_timeout,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

/// Pull the most useful message out of an error body.
fn provider_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        let detail = v.get("detail").unwrap_or(v);
        detail
            .get("error")
            .or_else(|| detail.get("message"))
            .and_then(Value::as_str)
            .or_else(|| detail.as_str())
            .map(str::to_string)
    });

    from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        } else {
            let mut preview: String = trimmed.chars().take(200).collect();
            if trimmed.chars().count() > 200 {
                preview.push('…');
            }
            preview
        }
    })
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, params: &SearchParams) -> Result<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::configuration("TAVILY_API_KEY is not set"))?;

        let timeout = params.timeout.unwrap_or(self.default_timeout);
        let response = self
            .http
            .post(self.search_url())
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    Error::timeout(format!("search request exceeded {}s", timeout.as_secs()))
                } else {
                    Error::Http(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(status.as_u16(), provider_message(status, &body)));
        }

        let results: Value = response.json().await?;
        let result_count = results
            .get("results")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        tracing::info!(query = %params.query, result_count, "Search results received");
        Ok(results)
    }
}
