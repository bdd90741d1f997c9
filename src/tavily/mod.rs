//! Search provider boundary: request parameters and the HTTP client.

pub mod client;
pub mod params;

#[cfg(test)]
pub use client::MockSearchProvider;
pub use client::{SearchProvider, TavilyClient};
pub use params::{
    AnswerMode, IncludeAnswer, IncludeRawContent, RawContentFormat, SearchDepth, SearchParams,
    TimeRange, Topic,
};
