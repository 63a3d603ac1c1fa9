use std::path::{Path, PathBuf};

use tokio::task::JoinHandle;

use crate::errors::{Result, WatchError};
use crate::events::EventFilter;
use crate::shared::{Shared, WorkerState};
use crate::sink::Sink;

/// Owning handle to a running directory watch.
///
/// Dropping it stops the worker, unless it was [detached](WatchHandle::detach).
#[derive(Debug)]
pub struct WatchHandle {
    pub(crate) cancel_on_drop: bool,
    pub(crate) inner: StopHandle,
    pub(crate) directory: PathBuf,
    pub(crate) jh: JoinHandle<Result<()>>,
}

/// Non-owning handle, usable from any thread to stop the worker or observe it.
#[derive(Clone, Debug)]
pub struct StopHandle {
    pub(crate) shared: Shared,
}

impl WatchHandle {
    pub fn builder() -> crate::WatcherBuilder<crate::Platform> {
        crate::WatcherBuilder::new()
    }

    /// Canonical path of the watched directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Wait for the worker to reach [`WorkerState::Stopped`].
    ///
    /// Yields `Ok(())` when the worker stopped because it was asked to (or its
    /// sink closed), and the fatal error otherwise. A worker whose runtime shut
    /// down underneath it yields [`WatchError::Cancelled`].
    pub async fn join(mut self) -> Result<()> {
        let joined = (&mut self.jh).await;

        // The worker is gone; dropping the handle must not record a stop request.
        self.cancel_on_drop = false;

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing_impl::error!(error = %e, "Could not join on task");
                Err(WatchError::Cancelled(e))
            }
        }
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.jh.is_finished()
    }

    /// Give up ownership without stopping the worker.
    /// This is a one way operation.
    pub fn detach(mut self) -> StopHandle {
        self.cancel_on_drop = false;
        self.handle()
    }

    /// Get a non-owning handle to the worker.
    pub fn handle(&self) -> StopHandle {
        self.inner.clone()
    }
}

impl StopHandle {
    /// Ask the worker to stop at its next wait boundary.
    ///
    /// Safe to call any number of times, from any thread. Returns whether this
    /// call was the one that made the request.
    pub fn stop(&self) -> bool {
        let first = self.shared.send_stop();

        if first {
            tracing_impl::debug!("Stop requested");
        }

        first
    }

    /// Whether a stop was requested, through any handle or by dropping the
    /// owning one.
    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop_requested()
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }
}

impl std::ops::Deref for WatchHandle {
    type Target = StopHandle;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::Drop for WatchHandle {
    fn drop(&mut self) {
        if self.cancel_on_drop {
            self.inner.shared.send_stop();
        }
    }
}

/// Start watching `directory` for the given kinds, sending every change to `sink`.
///
/// Must be called from within a tokio runtime; use [`WatchHandle::builder`]
/// to pick a runtime explicitly.
pub fn start_watching<S: Sink>(
    directory: impl AsRef<Path>,
    kinds: impl Into<EventFilter>,
    sink: S,
) -> Result<WatchHandle> {
    WatchHandle::builder().kinds(kinds).watch(directory, sink)
}
