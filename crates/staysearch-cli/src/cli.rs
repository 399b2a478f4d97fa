//! CLI argument definitions for StaySearch.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use clap::{Parser, Subcommand};

/// StaySearch -- ask a travel agent for places to stay.
#[derive(Parser)]
#[command(
    name = "staysearch",
    version,
    about = "StaySearch -- find places to stay with an MCP-backed agent",
    long_about = "Sends a free-text travel plan to a conversational agent that searches \
                  listings through an MCP tool server, then prints its answer. \
                  Without a subcommand, reads one query from stdin."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read one travel plan from stdin and print the agent's answer.
    Search,

    /// Start the web server with the embedded search page.
    Serve {
        /// Address to bind the HTTP server to.
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on.
        #[arg(long, short, default_value_t = 8501)]
        port: u16,
    },
}
