//! Runs one query and guarantees session cleanup.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use staysearch_mcp::McpError;

use crate::error::{Result, SearchError};
use crate::query::Query;
use crate::traits::{QueryAgent, SessionOwner};

/// Run `query` through `agent`, then close whatever sessions `sessions`
/// still holds.
///
/// Cleanup runs once, after the agent finishes, whether it succeeded,
/// failed or panicked.  A panic is resumed after cleanup.
///
/// # Errors
///
/// - the agent's error, after cleanup;
/// - [`SearchError::AgentExecutionWithCleanup`] when both the agent and the
///   cleanup fail;
/// - [`SearchError::SessionCleanup`] when only the cleanup fails.
pub async fn run_query(
    agent: &dyn QueryAgent,
    sessions: &dyn SessionOwner,
    query: &Query,
) -> Result<String> {
    let max_steps = agent.max_steps();
    tracing::info!(max_steps, query_len = query.as_str().len(), "running search query");

    let outcome = AssertUnwindSafe(agent.run(query, max_steps))
        .catch_unwind()
        .await;

    let cleanup = if sessions.has_active_sessions() {
        let closed = sessions.close_all_sessions().await;
        match &closed {
            Ok(()) => tracing::debug!("sessions closed after query"),
            Err(e) => tracing::warn!(error = %e, "closing sessions after query failed"),
        }
        closed
    } else {
        Ok(())
    };

    match outcome {
        Ok(result) => combine(result, cleanup),
        Err(panic) => {
            tracing::error!("search agent panicked; sessions were closed");
            std::panic::resume_unwind(panic)
        }
    }
}

fn combine(
    result: Result<String>,
    cleanup: std::result::Result<(), McpError>,
) -> Result<String> {
    match (result, cleanup) {
        (Ok(text), Ok(())) => Ok(text),
        (Ok(_), Err(cleanup)) => Err(SearchError::SessionCleanup(cleanup)),
        (Err(SearchError::AgentExecution(agent)), Err(cleanup)) => {
            Err(SearchError::AgentExecutionWithCleanup { agent, cleanup })
        }
        (Err(e), Err(cleanup)) => {
            tracing::warn!(error = %cleanup, "cleanup failure dropped in favour of {e}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use staysearch_agent::AgentError;

    enum Behavior {
        Answer(&'static str),
        Fail,
        Panic,
    }

    /// Opens a "session" on the shared owner, then behaves as scripted.
    struct StubAgent {
        behavior: Behavior,
        owner: Arc<StubSessions>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QueryAgent for StubAgent {
        async fn run(&self, _query: &Query, max_steps: u32) -> Result<String> {
            assert_eq!(max_steps, 7);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.owner.open.store(true, Ordering::SeqCst);
            match self.behavior {
                Behavior::Answer(text) => Ok(text.to_owned()),
                Behavior::Fail => Err(SearchError::AgentExecution(AgentError::LlmRequestFailed {
                    reason: "connection reset".into(),
                })),
                Behavior::Panic => panic!("agent blew up"),
            }
        }

        fn max_steps(&self) -> u32 {
            7
        }
    }

    #[derive(Default)]
    struct StubSessions {
        open: AtomicBool,
        closes: AtomicUsize,
        fail_close: bool,
    }

    #[async_trait]
    impl SessionOwner for StubSessions {
        fn has_active_sessions(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        async fn close_all_sessions(&self) -> std::result::Result<(), McpError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.open.store(false, Ordering::SeqCst);
            if self.fail_close {
                Err(McpError::ConnectionClosed)
            } else {
                Ok(())
            }
        }
    }

    fn agent(owner: &Arc<StubSessions>, behavior: Behavior) -> StubAgent {
        StubAgent {
            behavior,
            owner: Arc::clone(owner),
            calls: AtomicUsize::new(0),
        }
    }

    fn query() -> Query {
        Query::parse("Find a place in Chennai for 4 adults from July 1 to July 4").unwrap()
    }

    #[tokio::test]
    async fn success_returns_text_and_closes_once() {
        let owner = Arc::new(StubSessions::default());
        let agent = agent(&owner, Behavior::Answer("3 listings found..."));

        let text = run_query(&agent, owner.as_ref(), &query()).await.unwrap();
        assert_eq!(text, "3 listings found...");
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
        assert_eq!(owner.closes.load(Ordering::SeqCst), 1);
        assert!(!owner.has_active_sessions());
    }

    #[tokio::test]
    async fn failure_closes_once_then_propagates() {
        let owner = Arc::new(StubSessions::default());
        let agent = agent(&owner, Behavior::Fail);

        let err = run_query(&agent, owner.as_ref(), &query()).await.unwrap_err();
        assert!(matches!(err, SearchError::AgentExecution(AgentError::LlmRequestFailed { .. })));
        assert_eq!(owner.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_plus_cleanup_failure_reports_both() {
        let owner = Arc::new(StubSessions {
            fail_close: true,
            ..Default::default()
        });
        let agent = agent(&owner, Behavior::Fail);

        let err = run_query(&agent, owner.as_ref(), &query()).await.unwrap_err();
        assert!(matches!(err, SearchError::AgentExecutionWithCleanup { .. }));
        assert_eq!(owner.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cleanup_failure_after_success_is_surfaced() {
        let owner = Arc::new(StubSessions {
            fail_close: true,
            ..Default::default()
        });
        let agent = agent(&owner, Behavior::Answer("ok"));

        let err = run_query(&agent, owner.as_ref(), &query()).await.unwrap_err();
        assert!(matches!(err, SearchError::SessionCleanup(McpError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn panic_still_closes_sessions() {
        let owner = Arc::new(StubSessions::default());
        let agent = agent(&owner, Behavior::Panic);

        let outcome = AssertUnwindSafe(run_query(&agent, owner.as_ref(), &query()))
            .catch_unwind()
            .await;
        assert!(outcome.is_err());
        assert_eq!(owner.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nothing_open_means_no_close_call() {
        struct NoSessionAgent;

        #[async_trait]
        impl QueryAgent for NoSessionAgent {
            async fn run(&self, _query: &Query, _max_steps: u32) -> Result<String> {
                Err(SearchError::AgentExecution(AgentError::MaxTurnsExceeded {
                    task_id: Default::default(),
                    max_turns: 30,
                }))
            }

            fn max_steps(&self) -> u32 {
                30
            }
        }

        let owner = Arc::new(StubSessions::default());
        let err = run_query(&NoSessionAgent, owner.as_ref(), &query()).await.unwrap_err();
        assert!(err.is_step_budget_exceeded());
        assert_eq!(owner.closes.load(Ordering::SeqCst), 0);
    }
}
