//! Search parameter record sent to the provider.
//!
//! Unset optional fields are dropped from the request body. `timeout` is not
//! part of the body; it bounds the HTTP request instead.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    #[default]
    General,
    News,
    Finance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Basic,
    Advanced,
}

/// `include_answer`: a flag or an answer quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum IncludeAnswer {
    Flag(bool),
    Mode(AnswerMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RawContentFormat {
    Markdown,
    Text,
}

/// `include_raw_content`: a flag or an output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum IncludeRawContent {
    Flag(bool),
    Format(RawContentFormat),
}

/// Flattened search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub topic: Topic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_depth: Option<SearchDepth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_answer: Option<IncludeAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_raw_content: Option<IncludeRawContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl SearchParams {
    /// Minimal request: a query on the general topic.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            topic: Topic::General,
            search_depth: None,
            time_range: None,
            start_date: None,
            end_date: None,
            days: None,
            max_results: None,
            include_domains: None,
            exclude_domains: None,
            include_answer: None,
            include_raw_content: None,
            include_images: None,
            country: None,
            timeout: None,
        }
    }
}
