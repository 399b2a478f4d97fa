//! Newline-delimited JSON-RPC over a child process's stdin/stdout.
//!
//! A writer task owns stdin and drains an mpsc queue.  A reader task owns
//! stdout and routes each response to the oneshot registered under its id.
//! Server stderr is forwarded to `tracing` at debug level.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

use super::{McpTransport, lock};
use crate::error::{McpError, Result};
use crate::protocol::{Incoming, JsonRpcNotification, JsonRpcRequest, answer_server_request, classify};

type Pending = Arc<Mutex<HashMap<i64, oneshot::Sender<Result<Value>>>>>;

/// Stdio transport to a locally spawned MCP server.
pub struct StdioTransport {
    server: String,
    write_tx: mpsc::Sender<String>,
    pending: Pending,
    next_id: AtomicI64,
    alive: Arc<AtomicBool>,
    child: tokio::sync::Mutex<Option<Child>>,
    timeout: Duration,
}

impl StdioTransport {
    /// Spawn the server process and start the I/O tasks.
    ///
    /// Must be called from within a Tokio runtime.  The process is killed
    /// when the transport is dropped.
    pub fn spawn(
        server: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let spawn_failed = |reason: String| McpError::SpawnFailed {
            server: server.to_owned(),
            command: command.to_owned(),
            reason,
        };

        let mut child = cmd.spawn().map_err(|e| spawn_failed(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_failed("stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_failed("stdout not captured".into()))?;

        tracing::info!(server, command, pid = ?child.id(), "spawned MCP server");

        if let Some(stderr) = child.stderr.take() {
            let server = server.to_owned();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(server = %server, "{line}");
                }
            });
        }

        let alive = Arc::new(AtomicBool::new(true));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (write_tx, mut write_rx) = mpsc::channel::<String>(64);

        // Writer.
        let alive_writer = Arc::clone(&alive);
        let writer_server = server.to_owned();
        let mut stdin = stdin;
        tokio::spawn(async move {
            while let Some(line) = write_rx.recv().await {
                let written = async {
                    stdin.write_all(line.as_bytes()).await?;
                    stdin.flush().await
                }
                .await;
                if let Err(e) = written {
                    tracing::warn!(server = %writer_server, error = %e, "MCP stdin write failed");
                    alive_writer.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        // Reader.
        tokio::spawn(read_loop(
            server.to_owned(),
            stdout,
            Arc::clone(&pending),
            Arc::clone(&alive),
            write_tx.clone(),
        ));

        Ok(Self {
            server: server.to_owned(),
            write_tx,
            pending,
            next_id: AtomicI64::new(1),
            alive,
            child: tokio::sync::Mutex::new(Some(child)),
            timeout,
        })
    }

    async fn send_line(&self, message: &impl Serialize) -> Result<()> {
        if !self.is_alive() {
            return Err(McpError::ConnectionClosed);
        }
        let line = format!("{}\n", serde_json::to_string(message)?);
        self.write_tx
            .send(line)
            .await
            .map_err(|_| McpError::ConnectionClosed)
    }
}

async fn read_loop(
    server: String,
    stdout: ChildStdout,
    pending: Pending,
    alive: Arc<AtomicBool>,
    write_tx: mpsc::Sender<String>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(server = %server, error = %e, "MCP stdout read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message = serde_json::from_str::<Value>(&line)
            .map_err(McpError::from)
            .and_then(classify);
        match message {
            Ok(Incoming::Response(response)) => {
                let Some(id) = response.numeric_id() else {
                    tracing::warn!(server = %server, "response without numeric id ignored");
                    continue;
                };
                let waiter = lock(&pending).remove(&id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response.into_result());
                    }
                    None => tracing::debug!(server = %server, id, "late response dropped"),
                }
            }
            Ok(Incoming::Request { id, method }) => {
                let answer = answer_server_request(id, &method);
                if let Ok(json) = serde_json::to_string(&answer) {
                    let _ = write_tx.send(format!("{json}\n")).await;
                }
            }
            Ok(Incoming::Notification { method, .. }) => {
                tracing::debug!(server = %server, method = %method, "server notification");
            }
            Err(e) => {
                tracing::warn!(server = %server, error = %e, "unparseable MCP message");
            }
        }
    }

    alive.store(false, Ordering::SeqCst);
    // Dropping the senders wakes every waiter with ConnectionClosed.
    lock(&pending).clear();
    tracing::debug!(server = %server, "MCP stdout closed");
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        if let Err(e) = self.send_line(&JsonRpcRequest::new(id, method, params)).await {
            lock(&self.pending).remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(McpError::ConnectionClosed),
            Err(_) => {
                lock(&self.pending).remove(&id);
                Err(McpError::Timeout {
                    method: method.to_owned(),
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.send_line(&JsonRpcNotification::new(method, params)).await
    }

    async fn close(&self) -> Result<()> {
        self.alive.store(false, Ordering::SeqCst);
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };

        if let Ok(Some(status)) = child.try_wait() {
            tracing::debug!(server = %self.server, %status, "MCP server already exited");
            return Ok(());
        }
        child.kill().await.map_err(|e| McpError::Transport {
            reason: format!("failed to stop MCP server `{}`: {e}", self.server),
        })?;
        tracing::info!(server = %self.server, "stopped MCP server");
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
