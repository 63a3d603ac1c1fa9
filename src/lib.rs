#![doc = include_str!("docs/lib.md")]

/// Common Platform API Binding Interface
pub mod binding;

/// Errors produced by this crate
pub mod errors;

/// Destinations for drained events
pub mod sink;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        /// Platform API Binding Interface for the iNotify Linux API
        pub mod inotify;

        /// Default Platform Bindings which will be used.
        pub type Platform = inotify::InotifyBinding;
    } else {
        compile_error!("dirwatch only has a platform binding for linux (inotify)");
    }
}

// To Re-Export
mod builder;
mod events;
mod handle;
mod stream;
mod subscription;

pub use builder::*;
pub use errors::{Result, SinkClosed, WatchError};
pub use events::*;
pub use handle::*;
pub use shared::WorkerState;
pub use stream::*;
pub use subscription::*;

// Internals

/// State which is shared between the task and handles.
mod shared;

/// Task implementation
mod task;
