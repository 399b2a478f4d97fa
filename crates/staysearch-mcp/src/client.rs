//! The set of MCP sessions owned by one search agent.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::McpConfig;
use crate::error::{McpError, Result};
use crate::session::McpSession;
use crate::transport::lock;

/// Owns the descriptor and every session opened from it.
///
/// Sessions are opened on demand with [`create_all_sessions`] and released
/// with [`close_all_sessions`].  Dropping the client kills any stdio server
/// processes that are still running.
///
/// [`create_all_sessions`]: McpClient::create_all_sessions
/// [`close_all_sessions`]: McpClient::close_all_sessions
#[derive(Debug)]
pub struct McpClient {
    config: McpConfig,
    sessions: Mutex<BTreeMap<String, Arc<McpSession>>>,
}

impl McpClient {
    pub fn new(config: McpConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Load the descriptor at `path`.  No server is contacted yet.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        McpConfig::from_file(path).map(Self::new)
    }

    pub fn config(&self) -> &McpConfig {
        &self.config
    }

    /// Open a session to every configured server that lacks one.
    ///
    /// If any server fails to connect, the sessions opened by this call are
    /// closed again before the error is returned.
    pub async fn create_all_sessions(&self) -> Result<Vec<Arc<McpSession>>> {
        let mut opened: Vec<Arc<McpSession>> = Vec::new();

        for (name, server) in self.config.servers() {
            if lock(&self.sessions).contains_key(name) {
                continue;
            }
            match McpSession::connect(name, server).await {
                Ok(session) => {
                    let session = Arc::new(session);
                    lock(&self.sessions).insert(name.to_owned(), Arc::clone(&session));
                    opened.push(session);
                }
                Err(e) => {
                    tracing::warn!(server = name, error = %e, "MCP session failed to open");
                    for session in opened {
                        lock(&self.sessions).remove(session.name());
                        if let Err(close_err) = session.close().await {
                            tracing::warn!(server = %session.name(), error = %close_err, "rollback close failed");
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(self.active_sessions())
    }

    /// Every open session, ordered by server name.
    pub fn active_sessions(&self) -> Vec<Arc<McpSession>> {
        lock(&self.sessions).values().cloned().collect()
    }

    pub fn has_active_sessions(&self) -> bool {
        !lock(&self.sessions).is_empty()
    }

    /// The open session for `name`.
    pub fn session(&self, name: &str) -> Result<Arc<McpSession>> {
        lock(&self.sessions)
            .get(name)
            .cloned()
            .ok_or_else(|| McpError::UnknownServer {
                name: name.to_owned(),
            })
    }

    /// Close every open session.
    ///
    /// All sessions are removed and closed even when one of them fails; the
    /// first failure is returned.
    pub async fn close_all_sessions(&self) -> Result<()> {
        let sessions = std::mem::take(&mut *lock(&self.sessions));
        let mut first_error = None;

        for (name, session) in sessions {
            match session.close().await {
                Ok(()) => tracing::debug!(server = %name, "MCP session closed"),
                Err(e) => {
                    tracing::warn!(server = %name, error = %e, "MCP session close failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> McpClient {
        McpClient::new(
            McpConfig::from_json_str(r#"{"mcpServers": {"airbnb": {"command": "npx"}}}"#).unwrap(),
        )
    }

    #[test]
    fn starts_without_sessions() {
        let client = client();
        assert!(!client.has_active_sessions());
        assert!(client.active_sessions().is_empty());
        assert!(matches!(
            client.session("airbnb"),
            Err(McpError::UnknownServer { .. })
        ));
    }

    #[tokio::test]
    async fn close_with_nothing_open_is_ok() {
        let client = client();
        client.close_all_sessions().await.unwrap();
        assert!(!client.has_active_sessions());
    }

    #[tokio::test]
    async fn spawn_failure_leaves_no_sessions() {
        let client = McpClient::new(
            McpConfig::from_json_str(
                r#"{"mcpServers": {"ghost": {"command": "/nonexistent/staysearch-mcp-server"}}}"#,
            )
            .unwrap(),
        );
        let err = client.create_all_sessions().await.unwrap_err();
        assert!(matches!(err, McpError::SpawnFailed { .. }));
        assert!(!client.has_active_sessions());
    }
}
