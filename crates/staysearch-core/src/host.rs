//! Driving an async search to completion from synchronous host code.
//!
//! A host either already runs inside a Tokio runtime (the web server) or
//! has none at all (line mode).  [`HostLoop`] hides the difference behind a
//! single blocking call.

use std::any::Any;
use std::future::Future;
use std::sync::{Mutex, OnceLock, PoisonError};

use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tokio::task::JoinError;

use crate::error::{Result, SearchError};

/// Which event loop a blocking call should run on.
#[derive(Debug, Clone)]
pub enum HostLoop {
    /// Reuse the runtime that is driving the current thread.
    Attached(Handle),
    /// No runtime is available; start a private one per call.
    Fresh,
}

impl HostLoop {
    /// Inspect the calling thread.
    pub fn detect() -> Self {
        match Handle::try_current() {
            Ok(handle) => Self::Attached(handle),
            Err(_) => Self::Fresh,
        }
    }

    /// Run `fut` until it resolves and return its output.
    ///
    /// On a multi-thread runtime the calling worker is handed over with
    /// `block_in_place` while the future runs as a task on the same runtime.
    /// A current-thread runtime cannot drive the future while its only
    /// worker waits, so the future runs on a process-wide helper runtime.
    /// That runtime outlives every call, so background tasks started by one
    /// call (pooled HTTP connections, for instance) still serve the next.
    ///
    /// # Errors
    ///
    /// [`SearchError::HostPanicked`] if the future panicked or its task was
    /// cancelled, or if no runtime could be started.
    pub fn run_to_completion<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match self {
            Self::Attached(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => {
                    tracing::debug!("bridging onto the running multi-thread runtime");
                    tokio::task::block_in_place(|| handle.block_on(handle.spawn(fut)))
                        .map_err(lost_task)
                }
                _ => {
                    tracing::debug!("current-thread runtime; running on the helper runtime");
                    let task = helper_runtime()?.spawn(fut);
                    futures::executor::block_on(task).map_err(lost_task)
                }
            },
            Self::Fresh => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| SearchError::HostPanicked {
                        reason: format!("failed to start runtime: {e}"),
                    })?;
                runtime
                    .block_on(async move { tokio::spawn(fut).await })
                    .map_err(lost_task)
            }
        }
    }
}

/// The shared runtime used when the caller's own runtime cannot be blocked.
fn helper_runtime() -> Result<&'static Runtime> {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    static INIT: Mutex<()> = Mutex::new(());

    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }
    let _guard = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("staysearch-host")
        .enable_all()
        .build()
        .map_err(|e| SearchError::HostPanicked {
            reason: format!("failed to start helper runtime: {e}"),
        })?;
    Ok(RUNTIME.get_or_init(move || runtime))
}

fn lost_task(err: JoinError) -> SearchError {
    let reason = if err.is_panic() {
        panic_message(err.into_panic().as_ref())
    } else {
        "task was cancelled".to_owned()
    };
    SearchError::HostPanicked { reason }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
