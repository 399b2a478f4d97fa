//! Web interface for StaySearch.
//!
//! Serves a single page with one text box and a Search button, and the JSON
//! endpoints behind it:
//!
//! - `GET /` -- the embedded page.
//! - `POST /api/search` -- run one travel query through the cached agent.
//! - `GET /api/status` -- version, step budget, configured tool servers.

pub mod api;
pub mod frontend;
pub mod server;
pub mod state;

pub use server::WebServer;
pub use state::{AppState, PairFactory};

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 8501,
        }
    }
}
