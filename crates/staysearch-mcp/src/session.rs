//! One initialized connection to a tool server.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::config::McpServerConfig;
use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolResult, InitializeResult, ListToolsResult, McpToolDefinition, initialize_params,
};
use crate::transport::{self, McpTransport};

/// Upper bound on `tools/list` pages, guarding against a server that keeps
/// returning the same cursor.
const MAX_TOOL_PAGES: usize = 32;

/// A live MCP session: handshake done, tool list fetched.
pub struct McpSession {
    name: String,
    transport: Arc<dyn McpTransport>,
    server_info: InitializeResult,
    tools: Vec<McpToolDefinition>,
}

impl std::fmt::Debug for McpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSession")
            .field("name", &self.name)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl McpSession {
    /// Connect to the server described by `config` and run the handshake.
    pub async fn connect(name: &str, config: &McpServerConfig) -> Result<Self> {
        let transport = transport::connect(name, config).await?;
        match Self::over(name, Arc::clone(&transport)).await {
            Ok(session) => Ok(session),
            Err(e) => {
                // Don't leave a half-started server process behind.
                if let Err(close_err) = transport.close().await {
                    tracing::warn!(server = name, error = %close_err, "cleanup after failed handshake");
                }
                Err(e)
            }
        }
    }

    /// Run the handshake over an already-open transport.
    pub async fn over(name: &str, transport: Arc<dyn McpTransport>) -> Result<Self> {
        let init = transport.request("initialize", initialize_params()).await?;
        let server_info: InitializeResult =
            serde_json::from_value(init).map_err(|e| McpError::Protocol {
                reason: format!("bad initialize result from `{name}`: {e}"),
            })?;
        transport
            .notify("notifications/initialized", Value::Null)
            .await?;

        let tools = list_tools(name, transport.as_ref()).await?;
        tracing::info!(
            server = name,
            protocol = %server_info.protocol_version,
            tools = tools.len(),
            "MCP session ready"
        );

        Ok(Self {
            name: name.to_owned(),
            transport,
            server_info,
            tools,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tools(&self) -> &[McpToolDefinition] {
        &self.tools
    }

    pub fn server_info(&self) -> &InitializeResult {
        &self.server_info
    }

    pub fn is_alive(&self) -> bool {
        self.transport.is_alive()
    }

    /// Invoke a tool and return its raw result.
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<CallToolResult> {
        tracing::debug!(server = %self.name, tool, "calling MCP tool");
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        let raw = self
            .transport
            .request("tools/call", json!({"name": tool, "arguments": arguments}))
            .await?;
        serde_json::from_value(raw).map_err(|e| McpError::Protocol {
            reason: format!("bad tools/call result from `{}`: {e}", self.name),
        })
    }

    /// Shut the connection down.
    pub async fn close(&self) -> Result<()> {
        tracing::debug!(server = %self.name, "closing MCP session");
        self.transport.close().await
    }
}

async fn list_tools(name: &str, transport: &dyn McpTransport) -> Result<Vec<McpToolDefinition>> {
    let mut tools = Vec::new();
    let mut cursor: Option<String> = None;
    for _ in 0..MAX_TOOL_PAGES {
        let params = match &cursor {
            Some(c) => json!({"cursor": c}),
            None => Value::Null,
        };
        let page: ListToolsResult = serde_json::from_value(transport.request("tools/list", params).await?)
            .map_err(|e| McpError::Protocol {
                reason: format!("bad tools/list result from `{name}`: {e}"),
            })?;
        tools.extend(page.tools);
        match page.next_cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => return Ok(tools),
        }
    }
    tracing::warn!(server = name, "tools/list pagination cut off");
    Ok(tools)
}
