//! Search tools: `search_web`, `search_news`, `search_finance`.
//!
//! Arguments are passed through to the provider without range checks.
//! Provider faults are caught here and returned as error envelopes; only
//! faults the tool cannot attribute to the provider (undecodable arguments)
//! escape into the middleware chain.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::registry::{ToolEntry, ToolHandler, ToolRegistry};
use crate::envelope::{build_error, build_success, Envelope};
use crate::middleware::ToolCallContext;
use crate::tavily::{
    IncludeAnswer, IncludeRawContent, SearchDepth, SearchParams, SearchProvider, TimeRange, Topic,
};
use crate::types::{Error, Result};

fn default_max_results() -> u32 {
    5
}

fn default_timeout() -> u64 {
    60
}

/// Filters shared by every search tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchFilters {
    /// Search query
    pub query: String,
    /// Search depth (basic, advanced)
    #[serde(default)]
    pub search_depth: SearchDepth,
    /// Time range relative to today (day, week, month, year)
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    /// Start date (YYYY-MM-DD)
    #[serde(default)]
    pub start_date: Option<String>,
    /// End date (YYYY-MM-DD)
    #[serde(default)]
    pub end_date: Option<String>,
    /// Number of days back to search (1-30)
    #[serde(default)]
    pub days: Option<u32>,
    /// Maximum number of results (1-100)
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Only return results from these domains
    #[serde(default)]
    pub include_domains: Option<Vec<String>>,
    /// Never return results from these domains
    #[serde(default)]
    pub exclude_domains: Option<Vec<String>>,
    /// Include a generated answer (true, false, basic, advanced)
    #[serde(default)]
    pub include_answer: Option<IncludeAnswer>,
    /// Include raw page content (true, false, markdown, text)
    #[serde(default)]
    pub include_raw_content: Option<IncludeRawContent>,
    /// Include image results
    #[serde(default)]
    pub include_images: Option<bool>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Country to boost results from (ISO 3166-1 alpha-2)
    #[serde(default)]
    pub country: Option<String>,
}

/// `search_web` arguments: the shared filters plus a topic.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchWebArgs {
    #[serde(flatten)]
    pub filters: SearchFilters,
    /// Search topic (general, news, finance)
    #[serde(default)]
    pub topic: Topic,
}

fn non_empty_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_list(value: Option<Vec<String>>) -> Option<Vec<String>> {
    value.filter(|v| !v.is_empty())
}

impl SearchFilters {
    /// Flatten into the provider's parameter record.
    ///
    /// Empty filters (`days: 0`, empty domain lists, blank dates) are
    /// treated as unset and left out of the request.
    pub fn into_params(self, topic: Topic) -> SearchParams {
        SearchParams {
            query: self.query,
            topic,
            search_depth: Some(self.search_depth),
            time_range: self.time_range,
            start_date: non_empty_text(self.start_date),
            end_date: non_empty_text(self.end_date),
            days: self.days.filter(|d| *d > 0),
            max_results: Some(self.max_results),
            include_domains: non_empty_list(self.include_domains),
            exclude_domains: non_empty_list(self.exclude_domains),
            include_answer: self.include_answer,
            include_raw_content: self.include_raw_content,
            include_images: self.include_images,
            country: non_empty_text(self.country),
            timeout: Some(Duration::from_secs(self.timeout)),
        }
    }
}

/// Which topic a tool searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TopicSource {
    /// Taken from the `topic` argument.
    FromArgs,
    /// Fixed by the tool.
    Fixed(Topic),
}

/// One search tool bound to a provider.
pub struct SearchTool {
    name: &'static str,
    topic: TopicSource,
    provider: Arc<dyn SearchProvider>,
}

impl fmt::Debug for SearchTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchTool")
            .field("name", &self.name)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl SearchTool {
    pub fn web(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            name: "search_web",
            topic: TopicSource::FromArgs,
            provider,
        }
    }

    pub fn news(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            name: "search_news",
            topic: TopicSource::Fixed(Topic::News),
            provider,
        }
    }

    pub fn finance(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            name: "search_finance",
            topic: TopicSource::Fixed(Topic::Finance),
            provider,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn entry(&self) -> Result<ToolEntry> {
        match self.topic {
            TopicSource::FromArgs => ToolEntry::for_args::<SearchWebArgs>(
                self.name,
                "Search the web with Tavily. Supports depth, topic, time range, date bounds, domain filters, and result count.",
            ),
            TopicSource::Fixed(Topic::News) => ToolEntry::for_args::<SearchFilters>(
                self.name,
                "Search recent news with Tavily.",
            ),
            TopicSource::Fixed(_) => ToolEntry::for_args::<SearchFilters>(
                self.name,
                "Search finance information with Tavily.",
            ),
        }
    }

    /// Decode the call's arguments into provider parameters.
    fn params(&self, arguments: &Value) -> Result<SearchParams> {
        let decode_err = |err: serde_json::Error| {
            Error::validation(format!("invalid arguments for '{}': {}", self.name, err))
        };
        match self.topic {
            TopicSource::FromArgs => {
                let args: SearchWebArgs =
                    serde_json::from_value(arguments.clone()).map_err(decode_err)?;
                Ok(args.filters.into_params(args.topic))
            }
            TopicSource::Fixed(topic) => {
                let filters: SearchFilters =
                    serde_json::from_value(arguments.clone()).map_err(decode_err)?;
                Ok(filters.into_params(topic))
            }
        }
    }
}

#[async_trait]
impl ToolHandler for SearchTool {
    async fn call(&self, ctx: &ToolCallContext) -> Result<Value> {
        let params = self.params(ctx.arguments())?;
        tracing::info!(
            tool = self.name,
            request_id = %ctx.meta().request_id,
            "Calling '{}' tool with query: '{}'",
            self.name,
            params.query
        );

        let envelope: Envelope = match self.provider.search(&params).await {
            Ok(results) => build_success(params.query.as_str(), Some(results)).into(),
            Err(err) => {
                tracing::error!(
                    tool = self.name,
                    request_id = %ctx.meta().request_id,
                    error_kind = err.kind(),
                    "Error in '{}': {}",
                    self.name,
                    err
                );
                build_error(params.query.as_str(), &err, Some(self.name)).into()
            }
        };
        envelope.to_value()
    }
}

/// Register the three search tools against one provider.
pub fn register_search_tools(
    registry: &mut ToolRegistry,
    provider: Arc<dyn SearchProvider>,
) -> Result<()> {
    for tool in [
        SearchTool::web(provider.clone()),
        SearchTool::news(provider.clone()),
        SearchTool::finance(provider),
    ] {
        let entry = tool.entry()?;
        registry.register(entry, Arc::new(tool))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tavily::MockSearchProvider;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tracing_test::traced_test;

    fn ctx(tool: &str, arguments: Value) -> ToolCallContext {
        ToolCallContext::new(tool, arguments)
    }

    #[tokio::test]
    async fn test_search_web_wraps_results_in_success_envelope() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_search()
            .withf(|p| {
                p.query == "weather today"
                    && p.topic == Topic::General
                    && p.max_results == Some(5)
                    && p.search_depth == Some(SearchDepth::Basic)
                    && p.timeout == Some(Duration::from_secs(60))
            })
            .times(1)
            .returning(|_| Ok(json!([{"title": "A"}])));

        let tool = SearchTool::web(Arc::new(provider));
        let value = tool
            .call(&ctx("search_web", json!({"query": "weather today"})))
            .await
            .unwrap();

        assert_eq!(
            value,
            json!({"success": true, "query": "weather today", "data": [{"title": "A"}]})
        );
    }

    #[tokio::test]
    async fn test_fixed_topic_tools_ignore_topic_argument() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_search()
            .withf(|p| p.topic == Topic::Finance && p.days == Some(7))
            .times(1)
            .returning(|_| Ok(json!({"results": []})));

        let tool = SearchTool::finance(Arc::new(provider));
        let value = tool
            .call(&ctx(
                "search_finance",
                json!({"query": "NVDA", "days": 7, "topic": "news"}),
            ))
            .await
            .unwrap();
        assert_eq!(value["success"], json!(true));
    }

    #[tokio::test]
    async fn test_search_web_passes_filters_through() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_search()
            .withf(|p| {
                p.topic == Topic::News
                    && p.search_depth == Some(SearchDepth::Advanced)
                    && p.time_range == Some(TimeRange::Day)
                    && p.include_domains.as_deref() == Some(&["reuters.com".to_string()][..])
                    && p.include_answer == Some(IncludeAnswer::Flag(true))
                    && p.max_results == Some(250)
                    && p.country.as_deref() == Some("south korea")
            })
            .times(1)
            .returning(|_| Ok(json!({"results": []})));

        let tool = SearchTool::web(Arc::new(provider));
        let value = tool
            .call(&ctx(
                "search_web",
                json!({
                    "query": "election",
                    "topic": "news",
                    "search_depth": "advanced",
                    "time_range": "day",
                    "include_domains": ["reuters.com"],
                    "include_answer": true,
                    "max_results": 250,
                    "country": "south korea",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(value["success"], json!(true));
    }

    #[tokio::test]
    async fn test_empty_filters_are_not_forwarded() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_search()
            .withf(|p| {
                p.days.is_none()
                    && p.include_domains.is_none()
                    && p.exclude_domains.is_none()
                    && p.start_date.is_none()
                    && p.country.is_none()
            })
            .times(1)
            .returning(|_| Ok(json!({"results": []})));

        let tool = SearchTool::news(Arc::new(provider));
        let value = tool
            .call(&ctx(
                "search_news",
                json!({
                    "query": "q",
                    "days": 0,
                    "include_domains": [],
                    "exclude_domains": [],
                    "start_date": "",
                    "country": " ",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(value["success"], json!(true));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_provider_fault_becomes_error_envelope() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_search()
            .returning(|_| Err(Error::provider(432, "usage limit exceeded")));

        let tool = SearchTool::news(Arc::new(provider));
        let value = tool
            .call(&ctx("search_news", json!({"query": "bad query"})))
            .await
            .unwrap();

        assert_eq!(
            value,
            json!({
                "success": false,
                "query": "bad query",
                "error": "provider error (HTTP 432): usage limit exceeded",
                "func_name": "search_news",
            })
        );
        assert!(logs_contain("Error in 'search_news'"));
    }

    #[tokio::test]
    async fn test_undecodable_arguments_escape_as_fault() {
        let mut provider = MockSearchProvider::new();
        provider.expect_search().never();

        let tool = SearchTool::web(Arc::new(provider));
        let err = tool
            .call(&ctx("search_web", json!({"query": "q", "search_depth": "extreme"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("search_web")));

        let err = tool.call(&ctx("search_web", json!({}))).await.unwrap_err();
        assert!(err.to_string().contains("missing field `query`"));
    }

    #[test]
    fn test_register_search_tools() {
        let mut registry = ToolRegistry::new();
        register_search_tools(&mut registry, Arc::new(MockSearchProvider::new())).unwrap();
        assert_eq!(
            registry.names(),
            vec!["search_finance", "search_news", "search_web"]
        );

        let web = registry.get("search_web").unwrap();
        assert!(web.input_schema["properties"].get("topic").is_some());
        assert!(web.input_schema["properties"].get("query").is_some());
        assert_eq!(web.input_schema["required"], json!(["query"]));

        let news = registry.get("search_news").unwrap();
        assert!(news.input_schema["properties"].get("topic").is_none());
    }
}
