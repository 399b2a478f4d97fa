//! Shared application state for the web server.

use std::sync::Arc;

use staysearch_core::{
    AgentCache, Result, SearchConfig, SearchError, SearchPair, build_search_pair,
};
use staysearch_mcp::McpConfig;

use crate::WebConfig;

/// Builds the search pair on first use.
pub type PairFactory = Arc<dyn Fn() -> staysearch_core::Result<SearchPair> + Send + Sync>;

/// Shared state accessible from every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub config: WebConfig,

    /// The memoized agent pair; built by the first search.
    pub cache: Arc<AgentCache>,

    pub factory: PairFactory,

    /// Step budget reported by `/api/status`.
    pub max_steps: u32,

    /// Configured MCP server names reported by `/api/status`.
    pub servers: Vec<String>,
}

impl AppState {
    pub fn new(
        config: WebConfig,
        factory: PairFactory,
        max_steps: u32,
        servers: Vec<String>,
    ) -> Self {
        Self {
            config,
            cache: Arc::new(AgentCache::new()),
            factory,
            max_steps,
            servers,
        }
    }

    /// State whose agent is built from `search` on the first query.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Configuration`] when the tool descriptor cannot
    /// be read or parsed, so the server never starts with a broken one.
    pub fn from_search_config(config: WebConfig, search: SearchConfig) -> Result<Self> {
        let descriptor =
            McpConfig::from_file(&search.descriptor_path).map_err(|e| SearchError::Configuration {
                reason: e.to_string(),
            })?;
        let servers = descriptor.server_names().map(str::to_owned).collect();
        let max_steps = search.max_steps;
        let factory: PairFactory = Arc::new(move || build_search_pair(&search));
        Ok(Self::new(config, factory, max_steps, servers))
    }
}
