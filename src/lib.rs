//! # Tavily MCP - Search Tools over the Model Context Protocol
//!
//! Exposes Tavily web, news, and finance search as MCP tools:
//! - Uniform success/error envelopes for every tool result
//! - A middleware chain around each tool call (fault logging, timing, start/end records)
//! - Streamable-HTTP and stdio transports with a health route
//!
//! ## Architecture
//!
//! ```text
//!   HTTP / stdio ─▶ McpService ─▶ MiddlewareChain ─▶ SearchTool ─▶ SearchProvider
//!                      │                                               │
//!                  ToolRegistry                                   TavilyClient
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod envelope;
pub mod middleware;
pub mod server;
pub mod tavily;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
