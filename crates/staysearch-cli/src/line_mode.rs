//! One-shot prompt/response mode.
//!
//! Reads a single travel plan, runs it through a freshly built agent pair,
//! prints the answer and terminates. There is no Tokio runtime on this path,
//! so the query is driven through [`HostLoop`], which creates one.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use staysearch_core::{HostLoop, Query, SearchError, SearchPair};

pub const PROMPT: &str = "Enter your travel plan: ";

/// Exit code after a completed run, including the empty-input warning.
pub const EXIT_OK: u8 = 0;
/// Exit code after a configuration or agent failure.
pub const EXIT_FAILED: u8 = 1;

/// Prompt on `out`, read one line from `input` and answer it.
///
/// The answer goes to `out` and failures to `err`. `build` is only called
/// once the query is known to be non-empty.
///
/// # Errors
///
/// Returns an error only when reading the query or writing the output
/// fails. Search failures are printed and reported through the exit code.
pub fn run_line_mode<R, W, E, B>(mut input: R, out: &mut W, err: &mut E, build: B) -> Result<u8>
where
    R: BufRead,
    W: Write,
    E: Write,
    B: FnOnce() -> staysearch_core::Result<SearchPair>,
{
    write!(out, "{PROMPT}")?;
    out.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read query from stdin")?;
    let line = line.trim_end_matches(['\r', '\n']);

    let query = match Query::parse(line) {
        Ok(query) => query,
        Err(e) => {
            writeln!(out, "⚠️ {e}")?;
            return Ok(EXIT_OK);
        }
    };

    let outcome = build().and_then(|pair| {
        tracing::info!(max_steps = pair.max_steps(), "running query");
        HostLoop::detect()
            .run_to_completion(async move { pair.run(&query).await })
            .and_then(|result| result)
    });

    report(out, err, outcome)
}

fn report<W: Write, E: Write>(
    out: &mut W,
    err: &mut E,
    outcome: staysearch_core::Result<String>,
) -> Result<u8> {
    match outcome {
        Ok(text) => {
            writeln!(out, "✅ Search completed!")?;
            writeln!(out)?;
            writeln!(out, "🏡 Result:")?;
            writeln!(out, "{text}")?;
            Ok(EXIT_OK)
        }
        Err(e) => {
            log_failure(&e);
            writeln!(err, "❌ Error: {e}")?;
            Ok(EXIT_FAILED)
        }
    }
}

fn log_failure(err: &SearchError) {
    if err.is_step_budget_exceeded() {
        tracing::warn!(error = %err, "search ran out of steps");
    } else {
        tracing::error!(error = %err, "search failed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
