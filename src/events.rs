use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
};

use enumflags2::BitFlags;

/// Kinds of change a watch can subscribe to.
#[repr(u8)]
#[enumflags2::bitflags(default = Created | Modified | Deleted)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// New entry was created in, or moved into, the watched directory
    Created,
    /// Entry contents or metadata were changed
    Modified,
    /// Entry was deleted from, or moved out of, the watched directory
    Deleted,
}

/// Combined subscription flags.
pub type EventFilter = BitFlags<EventKind>;

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Modified => "modified",
            EventKind::Deleted => "deleted",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change reported for an entry of the watched directory.
///
/// `path` is relative to the watched directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: EventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Checks if a given filter contains this event.
    pub(crate) fn contained_in(&self, filter: &EventFilter) -> bool {
        filter.contains(self.kind)
    }
}

impl Display for ChangeEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Received {} event for file: {}",
            self.kind,
            self.path.display()
        )
    }
}
