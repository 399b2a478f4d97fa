//! Search orchestration for StaySearch.
//!
//! Turns configuration into a ready agent, runs one travel query through it
//! with guaranteed tool-session cleanup, and bridges that async work into
//! whatever execution model the host (web server or terminal) has.
//!
//! ```text
//! SearchConfig ──build_search_pair──> SearchPair ──run──> run_query
//!                                        │                   │
//!                                  AgentCache (web)    close_all_sessions
//! ```

pub mod agent;
pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod host;
pub mod query;
pub mod runner;
pub mod traits;

pub use agent::SearchAgent;
pub use cache::AgentCache;
pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use factory::{SearchPair, build_search_pair};
pub use host::HostLoop;
pub use query::Query;
pub use runner::run_query;
pub use traits::{QueryAgent, SessionOwner};
