use std::{
    future::Future,
    hash::Hash,
    path::{Path, PathBuf},
    pin::Pin,
    task::{Context, Poll},
};

use crate::errors::Result;
use crate::events::{EventFilter, EventKind};

/// Raw event categories a platform binding can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BindingEventType {
    Create,
    Modify,
    Delete,
    MoveFrom { cookie: u32 },
    MoveTo { cookie: u32 },
    /// The kernel event queue overflowed and events were dropped
    Overflow,
    /// The watched directory itself went away, or the watch was dropped
    SelfRemoved,
}

impl BindingEventType {
    /// The subscription kind this raw event reports, if any.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            BindingEventType::Create | BindingEventType::MoveTo { .. } => Some(EventKind::Created),
            BindingEventType::Modify => Some(EventKind::Modified),
            BindingEventType::Delete | BindingEventType::MoveFrom { .. } => {
                Some(EventKind::Deleted)
            }
            BindingEventType::Overflow | BindingEventType::SelfRemoved => None,
        }
    }

    pub fn should_remove_watch(&self) -> bool {
        matches!(self, BindingEventType::SelfRemoved)
    }
}

/// One record read from the platform facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingEvent<I> {
    pub wd: I,
    /// Entry name relative to the watched directory, absent for events on the
    /// directory itself
    pub path: Option<PathBuf>,
    pub ty: Vec<BindingEventType>,
}

/// Platform notification facility.
///
/// The only contract the watcher relies on is "waiting yields a batch of
/// events"; everything platform specific stays behind this trait.
pub trait Binding: Sized {
    type Identifier: Copy + Eq + Hash + std::fmt::Debug + 'static;

    /// Open a new instance of the facility.
    fn open() -> Result<Self>;

    /// Create a new watch
    fn create(&mut self, path: &Path, filter: EventFilter) -> Result<Self::Identifier>;

    /// Re-arm an existing watch after a batch was consumed.
    ///
    /// Facilities that deliver one batch per registration must re-register here,
    /// otherwise further changes are lost.
    fn rearm(&mut self, id: Self::Identifier, path: &Path, filter: EventFilter) -> Result<()>;

    /// Remove an existing watch
    fn remove(&mut self, id: Self::Identifier) -> Result<()>;

    /// Poll for the next non-empty batch of events.
    fn poll_events(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<std::io::Result<Vec<BindingEvent<Self::Identifier>>>>;

    /// Wait for the next batch of events.
    fn events(&mut self) -> Events<'_, Self> {
        Events { binding: self }
    }
}

/// Future returned by [`Binding::events`].
pub struct Events<'b, B> {
    binding: &'b mut B,
}

impl<B: Binding> Future for Events<'_, B> {
    type Output = std::io::Result<Vec<BindingEvent<B::Identifier>>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.binding.poll_events(cx)
    }
}
