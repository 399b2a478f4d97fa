//! Transports carry JSON-RPC messages between the client and one server.

pub mod http;
pub mod stdio;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{McpServerConfig, ServerTransport};
use crate::error::Result;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

/// A bidirectional JSON-RPC channel to one MCP server.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for its `result`.
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// Send a notification; no response is expected.
    async fn notify(&self, method: &str, params: Value) -> Result<()>;

    /// Release the connection.  Calling it twice is harmless.
    async fn close(&self) -> Result<()>;

    /// Whether the connection is still usable.
    fn is_alive(&self) -> bool;
}

/// Open the transport described by a server entry.
pub async fn connect(server: &str, config: &McpServerConfig) -> Result<Arc<dyn McpTransport>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.transport(server)? {
        ServerTransport::Stdio { command, args, env } => {
            let transport = StdioTransport::spawn(server, &command, &args, &env, timeout)?;
            Ok(Arc::new(transport))
        }
        ServerTransport::Http { url, headers } => {
            let transport = HttpTransport::new(url, &headers, timeout)?;
            Ok(Arc::new(transport))
        }
    }
}

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
