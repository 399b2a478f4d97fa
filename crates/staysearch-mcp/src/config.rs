//! The `mcpServers` descriptor file.
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "airbnb": {
//!       "command": "npx",
//!       "args": ["-y", "@openbnb/mcp-server-airbnb", "--ignore-robots-txt"]
//!     }
//!   }
//! }
//! ```
//!
//! A server entry is either a local process (`command`, `args`, `env`) spoken
//! to over stdio, or a remote endpoint (`url`, `headers`) spoken to over HTTP.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{McpError, Result};

/// Default per-request timeout for a server.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// One entry under `mcpServers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment for the spawned process.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Extra HTTP headers (e.g. authorization) for remote servers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// How to reach a server, derived from a validated [`McpServerConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTransport {
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    Http {
        url: url::Url,
        headers: HashMap<String, String>,
    },
}

impl McpServerConfig {
    /// Resolve the transport for this entry.
    ///
    /// # Errors
    ///
    /// [`McpError::InvalidDescriptor`] when the entry names both or neither
    /// of `command` and `url`, or when the URL is not http(s).
    pub fn transport(&self, server: &str) -> Result<ServerTransport> {
        let invalid = |reason: String| McpError::InvalidDescriptor {
            reason: format!("server `{server}`: {reason}"),
        };

        match (self.command.as_deref(), self.url.as_deref()) {
            (Some(_), Some(_)) => Err(invalid("set either `command` or `url`, not both".into())),
            (None, None) => Err(invalid("missing `command` or `url`".into())),
            (Some(command), None) => {
                if command.trim().is_empty() {
                    return Err(invalid("`command` is empty".into()));
                }
                Ok(ServerTransport::Stdio {
                    command: command.to_owned(),
                    args: self.args.clone(),
                    env: self.env.clone(),
                })
            }
            (None, Some(raw)) => {
                let url = url::Url::parse(raw).map_err(|e| invalid(format!("bad url: {e}")))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(invalid(format!("unsupported url scheme `{}`", url.scheme())));
                }
                Ok(ServerTransport::Http {
                    url,
                    headers: self.headers.clone(),
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DescriptorFile {
    #[serde(rename = "mcpServers")]
    mcp_servers: BTreeMap<String, McpServerConfig>,
}

/// The parsed descriptor: server name → connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpConfig {
    servers: BTreeMap<String, McpServerConfig>,
}

impl McpConfig {
    /// Read and validate a descriptor file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| McpError::InvalidDescriptor {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        let config = Self::from_json_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            servers = ?config.server_names().collect::<Vec<_>>(),
            "loaded MCP descriptor"
        );
        Ok(config)
    }

    /// Parse and validate descriptor JSON.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: DescriptorFile =
            serde_json::from_str(raw).map_err(|e| McpError::InvalidDescriptor {
                reason: format!("malformed JSON: {e}"),
            })?;
        Self::from_servers(file.mcp_servers)
    }

    /// Build from already-parsed entries, validating each one.
    pub fn from_servers(servers: BTreeMap<String, McpServerConfig>) -> Result<Self> {
        if servers.is_empty() {
            return Err(McpError::InvalidDescriptor {
                reason: "`mcpServers` is empty".into(),
            });
        }
        for (name, server) in &servers {
            if name.trim().is_empty() {
                return Err(McpError::InvalidDescriptor {
                    reason: "server names must be non-empty".into(),
                });
            }
            server.transport(name)?;
        }
        Ok(Self { servers })
    }

    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    pub fn server(&self, name: &str) -> Option<&McpServerConfig> {
        self.servers.get(name)
    }

    pub fn servers(&self) -> impl Iterator<Item = (&str, &McpServerConfig)> {
        self.servers.iter().map(|(k, v)| (k.as_str(), v))
    }
}
