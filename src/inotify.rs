use std::{
    ops::Deref,
    os::unix::prelude::{AsRawFd, FromRawFd, OwnedFd},
    path::{Path, PathBuf},
    task::{ready, Context, Poll},
};

use nix::sys::inotify::{AddWatchFlags, Inotify, InotifyEvent};
use tokio::io::{unix::AsyncFd, Interest};

use crate::binding::{Binding, BindingEvent, BindingEventType};
use crate::errors::{Result, WatchError};
use crate::events::{EventFilter, EventKind};

struct OwnedInotify(Inotify);

impl Drop for OwnedInotify {
    fn drop(&mut self) {
        // SAFETY:
        // - Drop is guaranteed to be called at most once
        // - Drop guarantees that we have exclusive access to self
        // - No references to self may exist after drop
        // - from_raw_fd requires that it is safe to forge ownership
        drop(unsafe { OwnedFd::from_raw_fd(self.0.as_raw_fd()) });
    }
}

impl Deref for OwnedInotify {
    type Target = Inotify;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRawFd for OwnedInotify {
    fn as_raw_fd(&self) -> std::os::unix::prelude::RawFd {
        self.0.as_raw_fd()
    }
}

/// Platform bindings for [`Inotify`][`nix::sys::inotify::Inotify`]
pub struct InotifyBinding {
    fd: AsyncFd<OwnedInotify>,
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct WatchIdentifier(nix::sys::inotify::WatchDescriptor);

impl InotifyBinding {
    /// Create a new platform binding for inotify.
    ///
    /// Must be called from within a tokio runtime, the descriptor is registered
    /// with its io driver.
    pub fn new() -> Result<Self> {
        use nix::sys::inotify::InitFlags;

        let inotify = Inotify::init(InitFlags::IN_NONBLOCK | InitFlags::IN_CLOEXEC)
            .map_err(|e| Self::convert_error(e, Path::new("")))?;

        let fd = AsyncFd::with_interest(OwnedInotify(inotify), Interest::READABLE)?;

        Ok(Self { fd })
    }

    fn create_mask(filter: EventFilter) -> AddWatchFlags {
        let mut out =
            AddWatchFlags::IN_DELETE_SELF | AddWatchFlags::IN_MOVE_SELF | AddWatchFlags::IN_ONLYDIR;

        for kind in filter.iter() {
            out |= match kind {
                EventKind::Created => AddWatchFlags::IN_CREATE | AddWatchFlags::IN_MOVED_TO,
                EventKind::Modified => AddWatchFlags::IN_MODIFY | AddWatchFlags::IN_ATTRIB,
                EventKind::Deleted => AddWatchFlags::IN_DELETE | AddWatchFlags::IN_MOVED_FROM,
            };
        }

        out
    }

    fn convert_mask(mask: AddWatchFlags, cookie: u32) -> Vec<BindingEventType> {
        macro_rules! check_mask {
            (fill $out:ident from { $($flags:expr => $body:expr,)* } ignoring $ignored:expr) => {
                $(if mask.bits() & ($flags).bits() > 0 {
                    ($out).push($body);
                })*

                let taken = $($flags |)* $ignored;
                let remainder = mask & !taken;

                if !remainder.is_empty() {
                    tracing_impl::warn!(?remainder, "Some Event Bits were not consumed");
                }
            };
        }

        let mut out = Vec::new();

        check_mask! { fill out from {
            AddWatchFlags::IN_CREATE => BindingEventType::Create,
            AddWatchFlags::IN_MODIFY | AddWatchFlags::IN_ATTRIB => BindingEventType::Modify,
            AddWatchFlags::IN_DELETE => BindingEventType::Delete,
            AddWatchFlags::IN_MOVED_TO => BindingEventType::MoveTo { cookie },
            AddWatchFlags::IN_MOVED_FROM => BindingEventType::MoveFrom { cookie },
            AddWatchFlags::IN_Q_OVERFLOW => BindingEventType::Overflow,

            AddWatchFlags::IN_DELETE_SELF
                | AddWatchFlags::IN_MOVE_SELF
                | AddWatchFlags::IN_UNMOUNT
                | AddWatchFlags::IN_IGNORED => BindingEventType::SelfRemoved,
        } ignoring AddWatchFlags::IN_ISDIR };

        out
    }

    fn convert_error(error: nix::Error, path: &Path) -> WatchError {
        use nix::errno::Errno;

        match error {
            Errno::EINVAL => {
                // This should always be considered a bug in the implementation,
                // crash so that we can find it faster.
                panic!(
                    "An invalid value was passed to some INotify flags! {}",
                    error
                );
            }
            Errno::EMFILE | Errno::ENFILE | Errno::ENOMEM | Errno::ENOSPC => {
                WatchError::ResourceLimit
            }
            Errno::EACCES => WatchError::NoPermission {
                path: path.to_path_buf(),
            },
            Errno::ENOENT | Errno::ENOTDIR => WatchError::DirectoryNotFound {
                path: path.to_path_buf(),
            },
            _ => WatchError::Facility(error.into()),
        }
    }

    fn convert_event(event: InotifyEvent) -> BindingEvent<WatchIdentifier> {
        BindingEvent {
            wd: WatchIdentifier(event.wd),
            path: event.name.map(PathBuf::from),
            ty: Self::convert_mask(event.mask, event.cookie),
        }
    }
}

impl Binding for InotifyBinding {
    type Identifier = WatchIdentifier;

    fn open() -> Result<Self> {
        Self::new()
    }

    fn create(&mut self, path: &Path, filter: EventFilter) -> Result<Self::Identifier> {
        let wd = self
            .fd
            .get_ref()
            .add_watch(path, Self::create_mask(filter))
            .map_err(|e| Self::convert_error(e, path))?;

        tracing_impl::debug!(?wd, "Added watch");

        Ok(WatchIdentifier(wd))
    }

    fn rearm(&mut self, id: Self::Identifier, path: &Path, filter: EventFilter) -> Result<()> {
        // inotify watches stay armed; re-adding the same mask is a no-op for the
        // kernel unless the watch was dropped underneath us.
        let wd = self
            .fd
            .get_ref()
            .add_watch(path, Self::create_mask(filter))
            .map_err(|e| match Self::convert_error(e, path) {
                WatchError::DirectoryNotFound { path } => WatchError::Closed { path },
                other => other,
            })?;

        if wd != id.0 {
            // A fresh descriptor means the original watch is gone; drop the new
            // one so it does not leak.
            let _ = self.fd.get_ref().rm_watch(wd);

            return Err(WatchError::Closed {
                path: path.to_path_buf(),
            });
        }

        Ok(())
    }

    fn remove(&mut self, id: Self::Identifier) -> Result<()> {
        use nix::errno::Errno;

        match self.fd.get_ref().rm_watch(id.0) {
            Ok(()) => Ok(()),
            // The kernel already dropped the watch (IN_IGNORED was delivered).
            Err(Errno::EINVAL) => Err(WatchError::Closed {
                path: PathBuf::new(),
            }),
            Err(e) => Err(Self::convert_error(e, Path::new(""))),
        }
    }

    fn poll_events(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<std::io::Result<Vec<BindingEvent<Self::Identifier>>>> {
        use nix::errno::Errno;

        loop {
            let mut read_guard = match ready!(self.fd.poll_read_ready_mut(cx)) {
                Ok(it) => it,
                Err(e) => return Poll::Ready(Err(e)),
            };

            let mut events = Vec::new();

            loop {
                let new = match read_guard.get_inner().read_events() {
                    Ok(events) => events,
                    Err(Errno::EAGAIN) => {
                        read_guard.clear_ready();
                        break;
                    }
                    Err(Errno::EINTR) => continue,
                    Err(e) => return Poll::Ready(Err(e.into())),
                };

                events.reserve(new.len());
                for event in new.into_iter() {
                    events.push(Self::convert_event(event));
                }
            }

            // Readiness can be spurious; only hand out non-empty batches.
            if !events.is_empty() {
                return Poll::Ready(Ok(events));
            }
        }
    }
}
