//! End-to-end tests for the web API.
//!
//! These tests spin up the real Axum router on an OS-assigned ephemeral
//! port and drive it with `reqwest`.  The search agent is replaced through
//! the state's factory so no model or tool server is needed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use staysearch_agent::AgentError;
use staysearch_core::{Query, QueryAgent, SearchError, SearchPair, SessionOwner};
use staysearch_mcp::McpError;
use staysearch_web::{AppState, PairFactory, WebConfig, WebServer};

const CHENNAI: &str = "Find a place in Chennai for 4 adults from July 1 to July 4";

// ── test doubles ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct Sessions {
    open: AtomicBool,
    closes: AtomicUsize,
}

#[async_trait]
impl SessionOwner for Sessions {
    fn has_active_sessions(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close_all_sessions(&self) -> Result<(), McpError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Opens a session, then answers or fails.
struct Agent {
    sessions: Arc<Sessions>,
    answer: Result<&'static str, &'static str>,
    runs: AtomicUsize,
}

#[async_trait]
impl QueryAgent for Agent {
    async fn run(&self, _query: &Query, _max_steps: u32) -> staysearch_core::Result<String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.sessions.open.store(true, Ordering::SeqCst);
        match self.answer {
            Ok(text) => Ok(text.to_owned()),
            Err(reason) => Err(SearchError::AgentExecution(AgentError::ToolExecutionFailed {
                tool_name: "airbnb_search".into(),
                reason: reason.into(),
            })),
        }
    }

    fn max_steps(&self) -> u32 {
        30
    }
}

struct Harness {
    base: String,
    client: reqwest::Client,
    sessions: Arc<Sessions>,
    agent: Arc<Agent>,
    builds: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
    server: tokio::task::JoinHandle<()>,
}

async fn start(answer: Result<&'static str, &'static str>) -> Harness {
    let sessions = Arc::new(Sessions::default());
    let agent = Arc::new(Agent {
        sessions: Arc::clone(&sessions),
        answer,
        runs: AtomicUsize::new(0),
    });
    let builds = Arc::new(AtomicUsize::new(0));

    let factory: PairFactory = {
        let sessions = Arc::clone(&sessions);
        let agent = Arc::clone(&agent);
        let builds = Arc::clone(&builds);
        Arc::new(move || {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(SearchPair::new(
                Arc::clone(&agent) as Arc<dyn QueryAgent>,
                Arc::clone(&sessions) as Arc<dyn SessionOwner>,
            ))
        })
    };

    let state = AppState::new(WebConfig::default(), factory, 30, vec!["airbnb".into()]);
    let server = WebServer::new(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        server
            .serve(listener, async move {
                rx.await.ok();
            })
            .await
            .unwrap();
    });

    Harness {
        base,
        client: reqwest::Client::new(),
        sessions,
        agent,
        builds,
        shutdown: Some(tx),
        server,
    }
}

impl Harness {
    async fn search(&self, query: &str) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}/api/search", self.base))
            .json(&json!({"query": query}))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn status(&self) -> Value {
        self.client
            .get(format!("{}/api/status", self.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        self.server.await.unwrap();
    }
}

// ── tests ────────────────────────────────────────────────────────────────────

#[test]
fn web_config_defaults() {
    let config = WebConfig::default();
    assert_eq!(config.bind_addr, "127.0.0.1");
    assert_eq!(config.port, 8501);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn index_page_has_search_form() {
    let h = start(Ok("unused")).await;
    let html = h
        .client
        .get(format!("{}/", h.base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Enter your travel plan:"));
    assert!(html.contains(">Search</button>"));
    h.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn chennai_query_succeeds() {
    let h = start(Ok("3 listings found...")).await;
    assert_eq!(h.status().await["agent_constructed"], false);

    let (code, body) = h.search(CHENNAI).await;
    assert_eq!(code, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["result"], "3 listings found...");
    assert_eq!(h.sessions.closes.load(Ordering::SeqCst), 1);

    let status = h.status().await;
    assert_eq!(status["agent_constructed"], true);
    assert_eq!(status["max_steps"], 30);
    assert_eq!(status["servers"], json!(["airbnb"]));
    h.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_query_warns_without_building_agent() {
    let h = start(Ok("unused")).await;

    for query in ["", "   "] {
        let (code, body) = h.search(query).await;
        assert_eq!(code, 400);
        assert_eq!(body["status"], "warning");
        assert_eq!(body["message"], "Please enter a valid query.");
    }

    assert_eq!(h.builds.load(Ordering::SeqCst), 0);
    assert_eq!(h.agent.runs.load(Ordering::SeqCst), 0);
    h.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failure_closes_sessions_then_reports() {
    let h = start(Err("tool transport closed")).await;

    let (code, body) = h.search(CHENNAI).await;
    assert_eq!(code, 500);
    assert_eq!(body["status"], "failed");
    assert!(body["error"].as_str().unwrap().contains("tool transport closed"));
    assert_eq!(h.sessions.closes.load(Ordering::SeqCst), 1);
    h.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn repeated_searches_build_agent_once() {
    let h = start(Ok("ok")).await;

    for _ in 0..3 {
        let (code, _) = h.search("Goa in December").await;
        assert_eq!(code, 200);
    }

    assert_eq!(h.builds.load(Ordering::SeqCst), 1);
    assert_eq!(h.agent.runs.load(Ordering::SeqCst), 3);
    assert_eq!(h.sessions.closes.load(Ordering::SeqCst), 3);
    h.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_tears_down_open_sessions() {
    let h = start(Ok("ok")).await;
    h.search("Goa").await;
    // Simulate a session left open outside a query.
    h.sessions.open.store(true, Ordering::SeqCst);

    let sessions = Arc::clone(&h.sessions);
    h.stop().await;
    assert!(!sessions.has_active_sessions());
    assert_eq!(sessions.closes.load(Ordering::SeqCst), 2);
}
