//! Per-invocation context and the logger handle it carries.
//!
//! Everything a middleware stage needs about the current call lives here:
//! request metadata, the tool's arguments, the optional logger, and the
//! timing stage's start mark / recorded duration. A context is owned by
//! exactly one in-flight call.

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::types::{ClientId, Error, RequestId, Result, SessionId};

/// Request metadata recorded on entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationMeta {
    pub request_id: RequestId,
    pub client_id: Option<ClientId>,
    pub session_id: Option<SessionId>,
}

/// One structured log record emitted by the middleware stages.
///
/// `at` is captured by the emitting stage, so consumers can compare records
/// without adding their own clock skew.
#[derive(Debug)]
pub enum LogRecord<'a> {
    Start {
        tool: &'a str,
        meta: &'a InvocationMeta,
        at: Instant,
    },
    End {
        tool: &'a str,
        meta: &'a InvocationMeta,
        elapsed: Option<Duration>,
        at: Instant,
    },
    Fault {
        tool: &'a str,
        meta: &'a InvocationMeta,
        error: &'a Error,
        elapsed: Option<Duration>,
    },
    /// The call's future was dropped before it produced an outcome.
    Cancelled {
        tool: &'a str,
        request_id: &'a RequestId,
        elapsed: Duration,
    },
}

/// Logger handle attached to a call context.
///
/// Returning an error is an instrumentation fault: stages swallow it.
pub trait InvocationLogger: Send + Sync + fmt::Debug {
    fn log(&self, record: &LogRecord<'_>) -> Result<()>;
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Default logger: forwards records as `tracing` events.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    server: String,
}

impl TracingLogger {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
        }
    }
}

impl InvocationLogger for TracingLogger {
    fn log(&self, record: &LogRecord<'_>) -> Result<()> {
        match record {
            LogRecord::Start { tool, meta, .. } => {
                tracing::info!(
                    server = %self.server,
                    tool = %tool,
                    request_id = %meta.request_id,
                    client_id = ?meta.client_id.as_ref().map(ClientId::as_str),
                    session_id = ?meta.session_id.as_ref().map(SessionId::as_str),
                    "Start processing tool request"
                );
            }
            LogRecord::End {
                tool,
                meta,
                elapsed,
                ..
            } => {
                tracing::info!(
                    server = %self.server,
                    tool = %tool,
                    request_id = %meta.request_id,
                    duration_ms = ?elapsed.map(millis),
                    "Successfully processed tool request"
                );
            }
            LogRecord::Fault {
                tool,
                meta,
                error,
                elapsed,
            } => {
                tracing::error!(
                    server = %self.server,
                    tool = %tool,
                    request_id = %meta.request_id,
                    error_kind = error.kind(),
                    error_debug = ?error,
                    duration_ms = ?elapsed.map(millis),
                    "Tool error: {}",
                    error
                );
            }
            LogRecord::Cancelled {
                tool,
                request_id,
                elapsed,
            } => {
                tracing::warn!(
                    server = %self.server,
                    tool = %tool,
                    request_id = %request_id,
                    duration_ms = millis(*elapsed),
                    "Tool request cancelled"
                );
            }
        }
        Ok(())
    }
}

/// State of one tool invocation.
#[derive(Debug)]
pub struct ToolCallContext {
    tool_name: String,
    arguments: Value,
    meta: InvocationMeta,
    logger: Option<Arc<dyn InvocationLogger>>,
    started_at: Option<Instant>,
    duration: Arc<OnceLock<Duration>>,
}

impl ToolCallContext {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            meta: InvocationMeta {
                request_id: RequestId::new(),
                client_id: None,
                session_id: None,
            },
            logger: None,
            started_at: None,
            duration: Arc::new(OnceLock::new()),
        }
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.meta.request_id = request_id;
        self
    }

    pub fn with_client_id(mut self, client_id: Option<ClientId>) -> Self {
        self.meta.client_id = client_id;
        self
    }

    pub fn with_session_id(mut self, session_id: Option<SessionId>) -> Self {
        self.meta.session_id = session_id;
        self
    }

    pub fn with_logger(mut self, logger: Option<Arc<dyn InvocationLogger>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    /// The `query` argument, or an empty string when absent or not a string.
    pub fn query(&self) -> &str {
        self.arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn meta(&self) -> &InvocationMeta {
        &self.meta
    }

    pub fn logger(&self) -> Option<&Arc<dyn InvocationLogger>> {
        self.logger.as_ref()
    }

    /// Record the timing stage's start mark.
    pub fn mark_started(&mut self, at: Instant) {
        self.started_at = Some(at);
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Time since the start mark, measured up to `now`.
    pub fn elapsed_at(&self, now: Instant) -> Option<Duration> {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
    }

    /// Store the final duration of the call. The first recording wins.
    pub fn record_duration(&mut self, duration: Duration) {
        let _ = self.duration.set(duration);
    }

    /// Shared handle to the duration slot, writable after the call is dropped.
    pub(crate) fn duration_slot(&self) -> Arc<OnceLock<Duration>> {
        Arc::clone(&self.duration)
    }

    /// Final duration, set once the timing stage has unwound or been dropped.
    pub fn duration(&self) -> Option<Duration> {
        self.duration.get().copied()
    }

    pub fn duration_ms(&self) -> Option<f64> {
        self.duration().map(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_falls_back_to_empty() {
        let ctx = ToolCallContext::new("search_web", json!({"query": "rust"}));
        assert_eq!(ctx.query(), "rust");

        let ctx = ToolCallContext::new("search_web", json!({"query": 7}));
        assert_eq!(ctx.query(), "");

        let ctx = ToolCallContext::new("search_web", json!(null));
        assert_eq!(ctx.query(), "");
    }

    #[test]
    fn test_elapsed_requires_start_mark() {
        let mut ctx = ToolCallContext::new("search_web", json!({}));
        let now = Instant::now();
        assert!(ctx.elapsed_at(now).is_none());

        ctx.mark_started(now);
        let later = now + Duration::from_millis(5);
        assert_eq!(ctx.elapsed_at(later), Some(Duration::from_millis(5)));
        assert!(ctx.duration_ms().is_none());

        ctx.record_duration(Duration::from_millis(5));
        assert_eq!(ctx.duration_ms(), Some(5.0));
    }

    #[test]
    fn test_builders_set_metadata() {
        let ctx = ToolCallContext::new("search_news", json!({}))
            .with_request_id(RequestId::from_string("r-1".to_string()).unwrap())
            .with_client_id(ClientId::from_string("agent".to_string()).ok())
            .with_session_id(None);

        assert_eq!(ctx.meta().request_id.as_str(), "r-1");
        assert_eq!(ctx.meta().client_id.as_ref().unwrap().as_str(), "agent");
        assert!(ctx.meta().session_id.is_none());
        assert!(ctx.logger().is_none());
    }
}
