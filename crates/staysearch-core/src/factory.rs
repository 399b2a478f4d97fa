//! Builds the agent/client pair a host runs queries through.

use std::sync::Arc;

use staysearch_agent::LlmClient;
use staysearch_mcp::McpClient;

use crate::agent::SearchAgent;
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::query::Query;
use crate::runner::run_query;
use crate::traits::{QueryAgent, SessionOwner};

/// An agent and the session owner it opens tools through.
///
/// Cloning is cheap and every clone shares one gate, so queries against a
/// pair never overlap: the next query starts only after the previous one
/// has closed its sessions.
#[derive(Clone)]
pub struct SearchPair {
    agent: Arc<dyn QueryAgent>,
    sessions: Arc<dyn SessionOwner>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl std::fmt::Debug for SearchPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPair")
            .field("max_steps", &self.agent.max_steps())
            .field("active_sessions", &self.sessions.has_active_sessions())
            .finish()
    }
}

impl SearchPair {
    pub fn new(agent: Arc<dyn QueryAgent>, sessions: Arc<dyn SessionOwner>) -> Self {
        Self {
            agent,
            sessions,
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn max_steps(&self) -> u32 {
        self.agent.max_steps()
    }

    /// Run one query, waiting for any query already in flight on this pair.
    pub async fn run(&self, query: &Query) -> Result<String> {
        let _turn = self.gate.lock().await;
        run_query(self.agent.as_ref(), self.sessions.as_ref(), query).await
    }

    /// Close any sessions left open.  Used on shutdown.
    pub async fn close(&self) -> Result<()> {
        let _turn = self.gate.lock().await;
        if self.sessions.has_active_sessions() {
            self.sessions
                .close_all_sessions()
                .await
                .map_err(SearchError::SessionCleanup)?;
        }
        Ok(())
    }
}

/// Build the pair described by `config`.
///
/// Reads the descriptor and prepares the LLM client; no server is contacted
/// until the first query.
pub fn build_search_pair(config: &SearchConfig) -> Result<SearchPair> {
    let client = McpClient::from_config_file(&config.descriptor_path).map_err(|e| {
        SearchError::Configuration {
            reason: e.to_string(),
        }
    })?;
    let client = Arc::new(client);

    let llm = LlmClient::new(config.llm_config()).map_err(|e| SearchError::Configuration {
        reason: e.to_string(),
    })?;

    let mut agent = SearchAgent::new(
        Arc::new(llm),
        Arc::clone(&client),
        &config.deployment_id,
        config.max_steps,
    );
    if let Some(prompt) = &config.system_prompt {
        agent = agent.with_system_prompt(prompt);
    }

    tracing::info!(
        deployment = %config.deployment_id,
        provider = config.provider.as_str(),
        max_steps = config.max_steps,
        servers = ?client.config().server_names().collect::<Vec<_>>(),
        "search agent constructed"
    );

    Ok(SearchPair::new(Arc::new(agent), client))
}
