//! MCP server surface.
//!
//! A [`ToolServer`] supplies clients, tools, and middleware stages.
//! [`McpService`] assembles them once and dispatches JSON-RPC requests;
//! the transports in [`http`] and [`stdio`] only move bytes.

pub mod http;
pub mod jsonrpc;
pub mod stdio;
pub mod tavily_server;

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use crate::envelope::{build_error, build_success, Envelope, SuccessEnvelope, HEALTH_CHECK_QUERY};
use crate::middleware::{InvocationLogger, MiddlewareChain, ToolCallContext, TracingLogger};
use crate::tools::ToolRegistry;
use crate::types::{codes, ClientId, Config, Error, RequestId, Result, SessionId};

pub use http::HttpServer;
pub use jsonrpc::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolCallResult, ToolContent,
};
pub use stdio::serve_stdio;
pub use tavily_server::TavilySearchServer;

/// Protocol revision reported when the client does not name one.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Capabilities a concrete server provides.
///
/// Called by [`McpService::build`] in declaration order, exactly once.
pub trait ToolServer: Send {
    /// Construct outbound clients from configuration.
    fn initialize_clients(&mut self, config: &Config) -> Result<()>;

    /// Register every tool the server exposes.
    fn register_tools(&self, registry: &mut ToolRegistry) -> Result<()>;

    /// Install middleware stages, outermost first.
    fn install_middlewares(&self, chain: &mut MiddlewareChain) {
        chain.install_core();
    }
}

/// Caller identity attached to every request from one connection or session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub client_id: Option<ClientId>,
    pub session_id: Option<SessionId>,
}

/// Name, version, and instructions reported in `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub instructions: Option<String>,
}

struct ServiceInner {
    info: ServerInfo,
    registry: ToolRegistry,
    chain: MiddlewareChain,
    logger: Option<Arc<dyn InvocationLogger>>,
}

/// Assembled server: registry, middleware chain, and invocation logger.
///
/// Cheap to clone; every transport task holds its own handle.
#[derive(Clone)]
pub struct McpService {
    inner: Arc<ServiceInner>,
}

impl fmt::Debug for McpService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpService")
            .field("info", &self.inner.info)
            .field("tools", &self.inner.registry.names())
            .field("middlewares", &self.inner.chain.stage_names())
            .finish()
    }
}

impl McpService {
    /// Build with a tracing-backed invocation logger.
    pub fn build<S: ToolServer>(server: S, config: &Config) -> Result<Self> {
        let logger: Arc<dyn InvocationLogger> =
            Arc::new(TracingLogger::new(config.server.name.clone()));
        Self::build_with_logger(server, config, Some(logger))
    }

    /// Build with an explicit logger; `None` disables invocation records.
    pub fn build_with_logger<S: ToolServer>(
        mut server: S,
        config: &Config,
        logger: Option<Arc<dyn InvocationLogger>>,
    ) -> Result<Self> {
        server.initialize_clients(config)?;

        let mut registry = ToolRegistry::new();
        server.register_tools(&mut registry)?;

        let mut chain = MiddlewareChain::new();
        server.install_middlewares(&mut chain);

        let info = ServerInfo {
            name: config.server.name.clone(),
            version: config.server.version.clone(),
            instructions: config.server.instructions.clone(),
        };
        tracing::info!(
            server = %info.name,
            tools = ?registry.names(),
            middlewares = ?chain.stage_names(),
            "MCP server assembled"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                info,
                registry,
                chain,
                logger,
            }),
        })
    }

    pub fn info(&self) -> &ServerInfo {
        &self.inner.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.inner.registry
    }

    /// Liveness payload for the health route.
    pub fn health(&self) -> SuccessEnvelope {
        build_success(HEALTH_CHECK_QUERY, Some(Value::from("OK")))
    }

    /// Run one tool through the middleware chain.
    ///
    /// Faults that escape the chain become error envelopes carrying the
    /// tool name. Only an unknown tool is reported as an `Err`.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        request_id: RequestId,
        origin: &RequestOrigin,
    ) -> Result<ToolCallResult> {
        let handler = self
            .inner
            .registry
            .handler(name)
            .ok_or_else(|| Error::validation(format!("Unknown tool: {}", name)))?;

        let arguments = if arguments.is_null() {
            Value::Object(Default::default())
        } else {
            arguments
        };
        let mut ctx = ToolCallContext::new(name, arguments)
            .with_request_id(request_id)
            .with_client_id(origin.client_id.clone())
            .with_session_id(origin.session_id.clone())
            .with_logger(self.inner.logger.clone());

        let value = match self.inner.chain.execute(&mut ctx, handler.as_ref()).await {
            Ok(value) => value,
            Err(fault) => {
                let envelope: Envelope = build_error(ctx.query(), fault.error(), Some(name)).into();
                envelope.to_value()?
            }
        };
        ToolCallResult::from_value(value)
    }

    /// Dispatch one JSON-RPC message. Notifications produce no response.
    pub async fn handle(
        &self,
        request: JsonRpcRequest,
        origin: &RequestOrigin,
    ) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        if request.jsonrpc != jsonrpc::JSONRPC_VERSION {
            return id.map(|id| {
                JsonRpcResponse::failure(
                    id,
                    codes::INVALID_REQUEST,
                    format!("Unsupported jsonrpc version: '{}'", request.jsonrpc),
                )
            });
        }

        let outcome = self.dispatch(&request, origin).await;
        let id = match id {
            Some(id) => id,
            None => {
                if let Err(err) = &outcome {
                    tracing::debug!(method = %request.method, "Notification failed: {}", err);
                }
                return None;
            }
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                tracing::debug!(method = %request.method, "Request failed: {}", err);
                JsonRpcResponse::from_error(id, &err)
            }
        })
    }

    async fn dispatch(&self, request: &JsonRpcRequest, origin: &RequestOrigin) -> Result<Value> {
        match request.method.as_str() {
            "initialize" => Ok(self.initialize_result(request.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.inner.registry.list_entries() })),
            "tools/call" => {
                let params: ToolCallParams =
                    serde_json::from_value(request.params.clone().unwrap_or(Value::Null))
                        .map_err(|err| Error::validation(format!("invalid tools/call params: {}", err)))?;
                let request_id = RequestId::from_jsonrpc(request.id.as_ref());
                let result = self
                    .call_tool(&params.name, params.arguments, request_id, origin)
                    .await?;
                Ok(serde_json::to_value(result)?)
            }
            method if method.starts_with("notifications/") => Ok(Value::Null),
            method => Err(Error::not_found(format!("Unknown method: {}", method))),
        }
    }

    fn initialize_result(&self, params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(PROTOCOL_VERSION);
        let info = &self.inner.info;

        let mut result = json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": info.name, "version": info.version },
        });
        if let Some(instructions) = &info.instructions {
            result["instructions"] = Value::from(instructions.as_str());
        }
        result
    }
}

/// Client name announced in an `initialize` request, if any.
pub(crate) fn announced_client(request: &JsonRpcRequest) -> Option<ClientId> {
    if request.method != "initialize" {
        return None;
    }
    request
        .params
        .as_ref()?
        .get("clientInfo")?
        .get("name")?
        .as_str()
        .and_then(|name| ClientId::from_string(name.to_string()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::testing::{Captured, RecordingLogger};
    use crate::tools::{FnTool, ToolEntry};
    use futures::FutureExt;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct EchoServer {
        initialized: bool,
    }

    impl ToolServer for EchoServer {
        fn initialize_clients(&mut self, _config: &Config) -> Result<()> {
            self.initialized = true;
            Ok(())
        }

        fn register_tools(&self, registry: &mut ToolRegistry) -> Result<()> {
            if !self.initialized {
                return Err(Error::internal("clients not initialized"));
            }
            registry.register(
                ToolEntry {
                    name: "echo".to_string(),
                    description: "Echo the query".to_string(),
                    input_schema: json!({"type": "object"}),
                },
                Arc::new(FnTool::new(|ctx| {
                    let query = ctx.query().to_string();
                    async move {
                        if query == "boom" {
                            return Err(Error::internal("echo exploded"));
                        }
                        let envelope: Envelope = build_success(query.clone(), Some(json!(query))).into();
                        envelope.to_value()
                    }
                    .boxed()
                })),
            )
        }
    }

    fn service_with(logger: Option<Arc<dyn InvocationLogger>>) -> McpService {
        McpService::build_with_logger(EchoServer::default(), &Config::default(), logger).unwrap()
    }

    fn origin() -> RequestOrigin {
        RequestOrigin {
            client_id: ClientId::from_string("cli".to_string()).ok(),
            session_id: Some(SessionId::new()),
        }
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let service = service_with(None);
        let response = service
            .handle(
                JsonRpcRequest::new(1, "initialize", Some(json!({"protocolVersion": "2025-03-26"}))),
                &origin(),
            )
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], json!("2025-03-26"));
        assert_eq!(result["serverInfo"]["name"], json!("tavily-search"));
        assert!(result["capabilities"].get("tools").is_some());
        assert!(result["instructions"].as_str().unwrap().contains("Tavily"));
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let service = service_with(None);
        let notification: JsonRpcRequest = serde_json::from_value(
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .unwrap();
        assert!(service.handle(notification, &origin()).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_version() {
        let service = service_with(None);
        let response = service
            .handle(JsonRpcRequest::new(2, "resources/list", None), &origin())
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, codes::METHOD_NOT_FOUND);

        let mut request = JsonRpcRequest::new(3, "ping", None);
        request.jsonrpc = "1.0".to_string();
        let response = service.handle(request, &origin()).await.unwrap();
        assert_eq!(response.error.unwrap().code, codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_tools_list_and_unknown_tool() {
        let service = service_with(None);
        let response = service
            .handle(JsonRpcRequest::new(4, "tools/list", None), &origin())
            .await
            .unwrap();
        assert_eq!(response.result.unwrap()["tools"][0]["name"], json!("echo"));

        let response = service
            .handle(
                JsonRpcRequest::new(5, "tools/call", Some(json!({"name": "nope"}))),
                &origin(),
            )
            .await
            .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, codes::INVALID_PARAMS);
        assert!(error.message.contains("Unknown tool: nope"));
    }

    #[tokio::test]
    async fn test_call_tool_success_is_logged_with_origin() {
        let logger = Arc::new(RecordingLogger::default());
        let service = service_with(Some(logger.clone() as Arc<dyn InvocationLogger>));

        let result = service
            .call_tool("echo", json!({"query": "hi"}), RequestId::new(), &origin())
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(
            result.structured_content,
            json!({"success": true, "query": "hi", "data": "hi"})
        );

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], Captured::Start { ref tool, .. } if tool == "echo"));
        assert!(matches!(records[1], Captured::End { elapsed: Some(_), .. }));
    }

    #[tokio::test]
    async fn test_escaped_fault_becomes_error_envelope() {
        let logger = Arc::new(RecordingLogger::default());
        let service = service_with(Some(logger.clone() as Arc<dyn InvocationLogger>));

        let result = service
            .call_tool("echo", json!({"query": "boom"}), RequestId::new(), &origin())
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(
            result.structured_content,
            json!({
                "success": false,
                "query": "boom",
                "error": "internal error: echo exploded",
                "func_name": "echo",
            })
        );

        let faults = logger
            .records()
            .into_iter()
            .filter(|r| matches!(r, Captured::Fault { .. }))
            .count();
        assert_eq!(faults, 1);
    }

    #[test]
    fn test_health_payload() {
        let service = service_with(None);
        assert_eq!(
            serde_json::to_value(service.health()).unwrap(),
            json!({"success": true, "query": "MCP Server Health Check", "data": "OK"})
        );
    }

    #[test]
    fn test_announced_client() {
        let request = JsonRpcRequest::new(
            1,
            "initialize",
            Some(json!({"clientInfo": {"name": "inspector", "version": "1"}})),
        );
        assert_eq!(announced_client(&request).unwrap().as_str(), "inspector");
        assert!(announced_client(&JsonRpcRequest::new(1, "ping", None)).is_none());
    }
}
