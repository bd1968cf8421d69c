//! Tokio re-exports shared by every crate of the workspace,
//! plus a named task spawner.

pub use ::tokio::*;

use log::trace;
use std::future::Future;

// Spawn a task on the current runtime
// The name is only used for tracing purposes
pub fn spawn_task<F>(name: impl Into<String>, future: F) -> task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    if log::log_enabled!(log::Level::Trace) {
        trace!("Spawning task: {}", name.into());
    }

    ::tokio::spawn(future)
}
