//! Model Context Protocol (MCP) client for StaySearch.
//!
//! The search agent reaches its listing-lookup tool through MCP.  This crate
//! reads the JSON descriptor that says how to reach each tool server, opens
//! sessions over stdio or HTTP, and exposes each session's tools to the
//! ReAct loop through [`McpToolAdapter`].
//!
//! - [`config`] -- The `mcpServers` descriptor file.
//! - [`protocol`] -- JSON-RPC 2.0 envelopes and the MCP payloads we use.
//! - [`transport`] -- Stdio and HTTP transports.
//! - [`session`] -- One initialized connection and its tool list.
//! - [`client`] -- The set of sessions owned by one agent.
//! - [`adapter`] -- Bridge from a session to the agent's `ToolAdapter`.

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use adapter::McpToolAdapter;
pub use client::McpClient;
pub use config::{McpConfig, McpServerConfig, ServerTransport};
pub use error::{McpError, Result};
pub use session::McpSession;
