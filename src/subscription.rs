use std::path::{Path, PathBuf};

use crate::errors::{Result, WatchError};
use crate::events::EventFilter;

/// One directory being observed and the kinds of change it was registered for.
///
/// Created once when a watch starts and never mutated afterwards; the worker
/// only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSubscription {
    directory: PathBuf,
    kinds: EventFilter,
}

impl WatchSubscription {
    /// Validate `directory` and pair it with the requested kinds.
    ///
    /// Fails with [`WatchError::DirectoryNotFound`] when the path does not exist
    /// or does not refer to a directory.
    pub fn new(directory: impl AsRef<Path>, kinds: impl Into<EventFilter>) -> Result<Self> {
        let requested = directory.as_ref();

        let not_found = || WatchError::DirectoryNotFound {
            path: requested.to_path_buf(),
        };

        let directory = requested.canonicalize().map_err(|_| not_found())?;

        if !directory.is_dir() {
            return Err(not_found());
        }

        Ok(Self {
            directory,
            kinds: kinds.into(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn kinds(&self) -> EventFilter {
        self.kinds
    }
}
