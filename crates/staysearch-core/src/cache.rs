//! Memoized search pair for long-lived hosts.

use tokio::sync::OnceCell;

use crate::error::{Result, SearchError};
use crate::factory::SearchPair;

/// Holds at most one [`SearchPair`] for the lifetime of a host.
///
/// The pair is built on first use.  A failed build is not cached, so the
/// next request tries again.
#[derive(Debug, Default)]
pub struct AgentCache {
    pair: OnceCell<SearchPair>,
}

impl AgentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached pair, building it with `build` if needed.
    ///
    /// Concurrent callers wait for a single build.
    pub async fn get_or_try_init<F>(&self, build: F) -> Result<&SearchPair>
    where
        F: FnOnce() -> Result<SearchPair>,
    {
        self.pair
            .get_or_try_init(move || async move {
                let pair = build()?;
                tracing::info!("search agent cached");
                Ok::<_, SearchError>(pair)
            })
            .await
    }

    pub fn is_constructed(&self) -> bool {
        self.pair.initialized()
    }

    /// Close any sessions the cached pair still holds.
    pub async fn teardown(&self) -> Result<()> {
        match self.pair.get() {
            Some(pair) => {
                tracing::info!("tearing down cached search agent");
                pair.close().await
            }
            None => Ok(()),
        }
    }
}
