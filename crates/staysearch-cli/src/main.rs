//! CLI entry point for StaySearch.
//!
//! This binary provides the `staysearch` command. Without a subcommand it
//! reads one travel plan from stdin and prints the agent's answer; `serve`
//! starts the web UI instead.

mod cli;
mod helpers;
mod line_mode;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use staysearch_core::{SearchConfig, build_search_pair};
use staysearch_web::{AppState, WebConfig, WebServer};

use crate::cli::{Cli, Commands};
use crate::helpers::init_tracing;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Search) => cmd_search(),
        Some(Commands::Serve { bind, port }) => cmd_serve(bind, port),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: search (default)
// ---------------------------------------------------------------------------

fn cmd_search() -> Result<ExitCode> {
    init_tracing("warn");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let code = line_mode::run_line_mode(stdin.lock(), &mut stdout, &mut stderr, || {
        let config = SearchConfig::from_env()?;
        build_search_pair(&config)
    })?;

    Ok(ExitCode::from(code))
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

fn cmd_serve(bind: String, port: u16) -> Result<ExitCode> {
    init_tracing("info");

    let search = SearchConfig::from_env().context("failed to load search configuration")?;
    tracing::info!(
        model = %search.deployment_id,
        provider = search.provider.as_str(),
        descriptor = %search.descriptor_path.display(),
        max_steps = search.max_steps,
        "configuration loaded"
    );

    let state = AppState::from_search_config(WebConfig { bind_addr: bind, port }, search)
        .context("invalid MCP descriptor")?;
    let server = WebServer::new(state);
    println!();
    println!("  StaySearch v{}", env!("CARGO_PKG_VERSION"));
    println!("  Open http://{} in your browser.", server.addr());
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime
        .block_on(server.start())
        .map_err(|e| anyhow!(e))
        .context("web server failed")?;

    Ok(ExitCode::SUCCESS)
}
