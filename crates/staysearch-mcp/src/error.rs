//! MCP client error types.

/// Errors raised while loading descriptors or talking to tool servers.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// The descriptor file is missing, unreadable or malformed.
    #[error("invalid MCP descriptor: {reason}")]
    InvalidDescriptor { reason: String },

    /// The tool server process could not be started.
    #[error("failed to spawn MCP server `{server}` ({command}): {reason}")]
    SpawnFailed {
        server: String,
        command: String,
        reason: String,
    },

    /// The transport failed to deliver a message.
    #[error("mcp transport error: {reason}")]
    Transport { reason: String },

    /// The connection to the server is gone.
    #[error("mcp connection closed")]
    ConnectionClosed,

    /// The server did not answer in time.
    #[error("mcp request `{method}` timed out after {secs}s")]
    Timeout { method: String, secs: u64 },

    /// The server answered with a JSON-RPC error object.
    #[error("mcp server error {code}: {message}")]
    Server { code: i32, message: String },

    /// The server answered with something that is not valid MCP.
    #[error("mcp protocol error: {reason}")]
    Protocol { reason: String },

    /// No session exists for the named server.
    #[error("unknown MCP server: {name}")]
    UnknownServer { name: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the MCP crate.
pub type Result<T> = std::result::Result<T, McpError>;

impl From<reqwest::Error> for McpError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            reason: err.to_string(),
        }
    }
}
