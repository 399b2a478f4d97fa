//! Seams between the query runner and the things it drives.

use async_trait::async_trait;
use staysearch_mcp::{McpClient, McpError};

use crate::error::Result;
use crate::query::Query;

/// Something that answers a query within a step budget.
#[async_trait]
pub trait QueryAgent: Send + Sync {
    /// Run the query to a final answer.
    async fn run(&self, query: &Query, max_steps: u32) -> Result<String>;

    /// The step budget this agent was built with.
    fn max_steps(&self) -> u32;
}

/// Something that holds tool sessions that must be released after a query.
#[async_trait]
pub trait SessionOwner: Send + Sync {
    fn has_active_sessions(&self) -> bool;

    async fn close_all_sessions(&self) -> std::result::Result<(), McpError>;
}

#[async_trait]
impl SessionOwner for McpClient {
    fn has_active_sessions(&self) -> bool {
        McpClient::has_active_sessions(self)
    }

    async fn close_all_sessions(&self) -> std::result::Result<(), McpError> {
        McpClient::close_all_sessions(self).await
    }
}
