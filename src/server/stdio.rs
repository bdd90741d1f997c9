//! Stdio transport: newline-delimited JSON-RPC.
//!
//! One session per stream. The client id is taken from the name announced
//! in `initialize`. Stdout carries protocol messages only.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use super::{announced_client, McpService, RequestOrigin};
use crate::types::SessionId;

/// Serve requests from `reader` until EOF, writing replies to `writer`.
pub async fn serve_stdio<R, W>(service: &McpService, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut origin = RequestOrigin {
        client_id: None,
        session_id: Some(SessionId::new()),
    };
    tracing::info!("MCP stdio transport ready");

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => {
                if let Some(client) = announced_client(&request) {
                    origin.client_id = Some(client);
                }
                service.handle(request, &origin).await
            }
            Err(err) => Some(JsonRpcResponse::parse_error(&err)),
        };

        if let Some(reply) = reply {
            let mut bytes = serde_json::to_vec(&reply)?;
            bytes.push(b'\n');
            writer.write_all(&bytes).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("MCP stdio transport closed");
    Ok(())
}
