//! The Tavily search server: one provider, three search tools.

use std::fmt;
use std::sync::Arc;

use super::ToolServer;
use crate::tavily::{SearchProvider, TavilyClient};
use crate::tools::{register_search_tools, ToolRegistry};
use crate::types::{Config, Error, Result};

/// [`ToolServer`] exposing `search_web`, `search_news`, and `search_finance`.
#[derive(Default)]
pub struct TavilySearchServer {
    provider: Option<Arc<dyn SearchProvider>>,
}

impl fmt::Debug for TavilySearchServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilySearchServer")
            .field("provider_ready", &self.provider.is_some())
            .finish()
    }
}

impl TavilySearchServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing provider instead of building a [`TavilyClient`].
    pub fn with_provider(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }
}

impl ToolServer for TavilySearchServer {
    fn initialize_clients(&mut self, config: &Config) -> Result<()> {
        if self.provider.is_none() {
            let client = TavilyClient::new(&config.tavily)?;
            tracing::debug!(client = ?client, "Tavily client initialized");
            self.provider = Some(Arc::new(client));
        }
        Ok(())
    }

    fn register_tools(&self, registry: &mut ToolRegistry) -> Result<()> {
        let provider = self
            .provider
            .clone()
            .ok_or_else(|| Error::internal("search provider not initialized"))?;
        register_search_tools(registry, provider)
    }
}
