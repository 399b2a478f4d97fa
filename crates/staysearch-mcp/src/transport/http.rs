//! Streamable HTTP transport: each message is a POST to the server endpoint.
//!
//! The server may answer with `application/json` or with a short
//! `text/event-stream` body carrying the response as an SSE event.  A
//! session id handed out on `initialize` is echoed on every later request
//! and released with a DELETE on close.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use super::{McpTransport, lock};
use crate::error::{McpError, Result};
use crate::protocol::{Incoming, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, classify};

/// Header carrying the server-assigned session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

pub struct HttpTransport {
    endpoint: url::Url,
    http: reqwest::Client,
    session_id: Mutex<Option<String>>,
    next_id: AtomicI64,
    alive: AtomicBool,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        endpoint: url::Url,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                McpError::InvalidDescriptor {
                    reason: format!("bad header name `{name}`: {e}"),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| McpError::InvalidDescriptor {
                reason: format!("bad value for header `{name}`: {e}"),
            })?;
            default_headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::Transport {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            endpoint,
            http,
            session_id: Mutex::new(None),
            next_id: AtomicI64::new(1),
            alive: AtomicBool::new(true),
            timeout,
        })
    }

    /// The session id assigned by the server, if any.
    pub fn session_id(&self) -> Option<String> {
        lock(&self.session_id).clone()
    }

    fn post(&self, body: &impl serde::Serialize) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(session) = self.session_id() {
            builder = builder.header(SESSION_HEADER, session);
        }
        builder
    }

    fn map_send_error(&self, method: &str, err: reqwest::Error) -> McpError {
        if err.is_timeout() {
            McpError::Timeout {
                method: method.to_owned(),
                secs: self.timeout.as_secs(),
            }
        } else {
            McpError::from(err)
        }
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        if !self.is_alive() {
            return Err(McpError::ConnectionClosed);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let response = self
            .post(&JsonRpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(|e| self.map_send_error(method, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Transport {
                reason: format!("HTTP {status} for `{method}`: {body}"),
            });
        }

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *lock(&self.session_id) = Some(session.to_owned());
        }

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(method, e))?;

        let reply = if is_sse {
            find_sse_response(&body, id)?
        } else {
            serde_json::from_str::<JsonRpcResponse>(&body).map_err(|e| McpError::Protocol {
                reason: format!("invalid JSON-RPC body for `{method}`: {e}"),
            })?
        };
        reply.into_result()
    }

    async fn notify(&self, method: &str, params: Value) -> Result<()> {
        if !self.is_alive() {
            return Err(McpError::ConnectionClosed);
        }
        let response = self
            .post(&JsonRpcNotification::new(method, params))
            .send()
            .await
            .map_err(|e| self.map_send_error(method, e))?;
        if !response.status().is_success() {
            return Err(McpError::Transport {
                reason: format!("HTTP {} for notification `{method}`", response.status()),
            });
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(session) = lock(&self.session_id).take() else {
            return Ok(());
        };
        // Servers may refuse explicit termination with 405; that is fine.
        let response = self
            .http
            .delete(self.endpoint.clone())
            .header(SESSION_HEADER, session)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::METHOD_NOT_ALLOWED {
            Ok(())
        } else {
            Err(McpError::Transport {
                reason: format!("HTTP {status} while closing MCP session"),
            })
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Pick the response to request `id` out of an SSE body.
fn find_sse_response(body: &str, id: i64) -> Result<JsonRpcResponse> {
    let body = body.replace("\r\n", "\n");
    for event in body.split("\n\n") {
        let data = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim_start)
            .collect::<Vec<_>>()
            .join("\n");
        if data.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(&data) else {
            continue;
        };
        if let Ok(Incoming::Response(response)) = classify(value)
            && response.numeric_id() == Some(id)
        {
            return Ok(response);
        }
    }
    Err(McpError::Protocol {
        reason: format!("event stream ended without a response to request {id}"),
    })
}
