use std::path::PathBuf;

use displaydoc::Display;
use thiserror::Error;

pub type Result<T, E = WatchError> = core::result::Result<T, E>;

/// Errors produced while registering or draining a directory watch
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum WatchError {
    /// Directory not found or not a directory: {path:?}
    DirectoryNotFound { path: PathBuf },

    /// Wait for events was interrupted by a stop request
    Interrupted,

    /// The watch facility failed: {0}
    Facility(#[from] std::io::Error),

    /// The watch on {path:?} was closed by an external action (deleted, moved, or unmounted)
    Closed { path: PathBuf },

    /// A system resource limit would be exceeded
    ResourceLimit,

    /// No permission to watch {path:?}
    NoPermission { path: PathBuf },

    /// No tokio runtime was supplied and none is running on this thread
    NoRuntime,

    /// The worker task was cancelled before it could stop: {0}
    Cancelled(#[source] tokio::task::JoinError),
}

impl WatchError {
    /// Whether this error marks the designed shutdown path rather than a fault.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, WatchError::Interrupted)
    }
}

/// The sink will not accept further events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Display)]
pub struct SinkClosed;
