//! Integration tests for the MCP client against real transports.
//!
//! The stdio tests drive a small `sh` script that speaks line-delimited
//! JSON-RPC; the HTTP tests run an axum server on an ephemeral port.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde_json::{Value, json};
use staysearch_agent::ToolAdapter;
use staysearch_mcp::{McpClient, McpConfig, McpError, McpServerConfig, McpToolAdapter};

// ---------------------------------------------------------------------------
// Stdio
// ---------------------------------------------------------------------------

/// Answers initialize, tools/list and tools/call; ignores notifications.
/// `tools/call` for `stall` is never answered.
const MOCK_SERVER: &str = r##"
echo "mock airbnb server ready" >&2
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/^{"jsonrpc":"2.0","id":\([0-9]*\),.*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","serverInfo":{"name":"mock","version":"1"},"capabilities":{"tools":{}}}}\n' "$id" ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"airbnb_search","description":"Search listings","inputSchema":{"type":"object"}},{"name":"stall"}]}}\n' "$id" ;;
    *'"name":"stall"'*)
      ;;
    *'"method":"tools/call"'*)
      printf '{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info"}}\n'
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"3 listings found in Chennai"}]}}\n' "$id" ;;
    *)
      ;;
  esac
done
"##;

fn write_script() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MOCK_SERVER.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn stdio_client(script: &tempfile::NamedTempFile, timeout_secs: u64) -> McpClient {
    let server = McpServerConfig {
        command: Some("sh".into()),
        args: vec![script.path().display().to_string()],
        env: Default::default(),
        url: None,
        headers: Default::default(),
        timeout_secs,
    };
    McpClient::new(McpConfig::from_servers(BTreeMap::from([("airbnb".to_string(), server)])).unwrap())
}

#[cfg(unix)]
#[tokio::test]
async fn stdio_session_round_trip() {
    let script = write_script();
    let client = stdio_client(&script, 10);

    let sessions = client.create_all_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(client.has_active_sessions());

    let session = client.session("airbnb").unwrap();
    assert_eq!(session.tools()[0].name, "airbnb_search");
    assert_eq!(
        session.server_info().server_info.as_ref().unwrap().name,
        "mock"
    );

    let adapter = McpToolAdapter::new(session);
    assert_eq!(adapter.adapter_id(), "mcp:airbnb");
    let text = adapter
        .execute("airbnb_search", json!({"location": "Chennai", "adults": 4}))
        .await
        .unwrap();
    assert_eq!(text, "3 listings found in Chennai");

    client.close_all_sessions().await.unwrap();
    assert!(!client.has_active_sessions());
}

#[cfg(unix)]
#[tokio::test]
async fn sessions_reopen_after_close() {
    let script = write_script();
    let client = stdio_client(&script, 10);

    client.create_all_sessions().await.unwrap();
    client.close_all_sessions().await.unwrap();
    // Closing twice is a no-op.
    client.close_all_sessions().await.unwrap();

    let sessions = client.create_all_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].is_alive());
    client.close_all_sessions().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn unanswered_request_times_out() {
    let script = write_script();
    let client = stdio_client(&script, 1);

    client.create_all_sessions().await.unwrap();
    let session = client.session("airbnb").unwrap();
    let err = session.call_tool("stall", Value::Null).await.unwrap_err();
    assert!(matches!(err, McpError::Timeout { ref method, secs: 1 } if method == "tools/call"));

    client.close_all_sessions().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn closed_session_rejects_calls() {
    let script = write_script();
    let client = stdio_client(&script, 10);

    client.create_all_sessions().await.unwrap();
    let session = client.session("airbnb").unwrap();
    client.close_all_sessions().await.unwrap();

    let err = session.call_tool("airbnb_search", json!({})).await.unwrap_err();
    assert!(matches!(err, McpError::ConnectionClosed));
}

#[tokio::test]
async fn descriptor_file_is_loaded_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"mcpServers": {{"airbnb": {{"command": "npx", "args": ["-y", "@openbnb/mcp-server-airbnb"]}}}}}}"#
    )
    .unwrap();

    let client = McpClient::from_config_file(file.path()).unwrap();
    assert_eq!(client.config().server_names().collect::<Vec<_>>(), vec!["airbnb"]);
    assert!(!client.has_active_sessions());
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

mod http {
    use super::*;

    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;

    const SESSION: &str = "sess-42";

    #[derive(Default)]
    struct MockState {
        requests: AtomicUsize,
        terminated: AtomicBool,
    }

    async fn handle(
        State(state): State<Arc<MockState>>,
        headers: HeaderMap,
        axum::Json(body): axum::Json<Value>,
    ) -> Response {
        state.requests.fetch_add(1, Ordering::SeqCst);
        let method = body["method"].as_str().unwrap_or_default().to_owned();
        let id = body["id"].clone();
        let has_session = headers
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
            == Some(SESSION);

        match method.as_str() {
            "initialize" => (
                [("mcp-session-id", SESSION)],
                axum::Json(json!({
                    "jsonrpc": "2.0", "id": id,
                    "result": {"protocolVersion": "2024-11-05", "serverInfo": {"name": "remote"}}
                })),
            )
                .into_response(),
            _ if !has_session => StatusCode::BAD_REQUEST.into_response(),
            "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
            "tools/list" => axum::Json(json!({
                "jsonrpc": "2.0", "id": id,
                "result": {"tools": [{"name": "airbnb_search", "inputSchema": {"type": "object"}}]}
            }))
            .into_response(),
            "tools/call" => {
                let event = json!({
                    "jsonrpc": "2.0", "id": id,
                    "result": {"content": [{"type": "text", "text": "2 listings in Goa"}]}
                });
                (
                    [("content-type", "text/event-stream")],
                    format!("event: message\ndata: {event}\n\n"),
                )
                    .into_response()
            }
            _ => axum::Json(json!({
                "jsonrpc": "2.0", "id": id,
                "error": {"code": -32601, "message": "method not found"}
            }))
            .into_response(),
        }
    }

    async fn terminate(State(state): State<Arc<MockState>>, headers: HeaderMap) -> StatusCode {
        if headers.get("mcp-session-id").is_some() {
            state.terminated.store(true, Ordering::SeqCst);
        }
        StatusCode::OK
    }

    async fn start_mock() -> (String, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/mcp", post(handle).delete(terminate))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/mcp"), state)
    }

    #[tokio::test]
    async fn http_session_round_trip() {
        let (url, state) = start_mock().await;
        let config = McpConfig::from_json_str(&format!(
            r#"{{"mcpServers": {{"remote": {{"url": "{url}", "timeout_secs": 5}}}}}}"#
        ))
        .unwrap();
        let client = McpClient::new(config);

        client.create_all_sessions().await.unwrap();
        let session = client.session("remote").unwrap();
        assert_eq!(session.tools().len(), 1);

        let result = session
            .call_tool("airbnb_search", json!({"location": "Goa"}))
            .await
            .unwrap();
        assert_eq!(result.to_text(), "2 listings in Goa");

        client.close_all_sessions().await.unwrap();
        assert!(state.terminated.load(Ordering::SeqCst));
        // initialize, initialized, tools/list, tools/call
        assert_eq!(state.requests.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn unreachable_server_fails_to_connect() {
        let config = McpConfig::from_json_str(
            r#"{"mcpServers": {"remote": {"url": "http://127.0.0.1:9/mcp", "timeout_secs": 2}}}"#,
        )
        .unwrap();
        let client = McpClient::new(config);

        let err = client.create_all_sessions().await.unwrap_err();
        assert!(matches!(
            err,
            McpError::Transport { .. } | McpError::Timeout { .. }
        ));
        assert!(!client.has_active_sessions());
    }
}
