use std::path::Path;

use tokio::sync::mpsc;

use crate::{
    binding::Binding,
    errors::{Result, WatchError},
    events::EventFilter,
    handle::{StopHandle, WatchHandle},
    shared::SharedState,
    sink::Sink,
    stream::ChangeStream,
    subscription::WatchSubscription,
    task::TaskState,
};

/// Configures and starts a directory watch.
pub struct WatcherBuilder<B> {
    kinds: EventFilter,
    buffer: usize,
    cancel_on_drop: bool,
    handle: Option<tokio::runtime::Handle>,
    binding: Option<B>,
}

impl<B> WatcherBuilder<B> {
    pub const DEFAULT_BUFFER: usize = 32;

    pub fn new() -> WatcherBuilder<B> {
        WatcherBuilder {
            kinds: EventFilter::default(),
            buffer: Self::DEFAULT_BUFFER,
            cancel_on_drop: true,
            handle: None,
            binding: None,
        }
    }

    /// Kinds of change to subscribe to. Defaults to all of them.
    pub fn kinds(self, kinds: impl Into<EventFilter>) -> Self {
        Self {
            kinds: kinds.into(),
            ..self
        }
    }

    /// Spawn the worker on this runtime instead of the current one.
    pub fn with_runtime(self, handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Some(handle),
            ..self
        }
    }

    /// Channel capacity used by [`WatcherBuilder::stream`].
    pub fn with_buffer(self, buffer: usize) -> Self {
        Self { buffer, ..self }
    }

    /// Whether dropping the [`WatchHandle`] stops the worker. Defaults to `true`.
    pub fn cancel_on_drop(self, cancel_on_drop: bool) -> Self {
        Self {
            cancel_on_drop,
            ..self
        }
    }

    /// Use an already opened facility instead of opening the platform default.
    pub fn with_binding<B2>(self, binding: B2) -> WatcherBuilder<B2> {
        WatcherBuilder {
            kinds: self.kinds,
            buffer: self.buffer,
            cancel_on_drop: self.cancel_on_drop,
            handle: self.handle,
            binding: Some(binding),
        }
    }
}

impl<B> WatcherBuilder<B>
where
    B: Binding + Send + 'static,
    B::Identifier: Send,
{
    /// Validate `directory`, register the subscription, and start the worker.
    ///
    /// Fails with [`WatchError::DirectoryNotFound`] without starting anything
    /// if the directory is missing.
    pub fn watch<S: Sink>(self, directory: impl AsRef<Path>, sink: S) -> Result<WatchHandle> {
        let subscription = WatchSubscription::new(directory, self.kinds)?;

        let runtime = match self.handle {
            Some(handle) => handle,
            None => tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?,
        };

        let binding = match self.binding {
            Some(binding) => binding,
            None => {
                // The platform binding registers with the io driver of the
                // runtime it is created in.
                let _guard = runtime.enter();
                B::open()?
            }
        };

        let (shared, cancel) = SharedState::new();
        let directory = subscription.directory().to_path_buf();

        let task_state = TaskState::new(shared.clone(), cancel, subscription, binding, sink)?;

        let jh = task_state.launch_in(runtime);

        let inner = StopHandle { shared };

        Ok(WatchHandle {
            cancel_on_drop: self.cancel_on_drop,
            inner,
            directory,
            jh,
        })
    }

    /// Like [`WatcherBuilder::watch`], but delivers events as a stream.
    pub fn stream(self, directory: impl AsRef<Path>) -> Result<(WatchHandle, ChangeStream)> {
        let (tx, rx) = mpsc::channel(self.buffer.max(1));

        let handle = self.watch(directory, tx)?;

        Ok((handle, ChangeStream::new(rx)))
    }
}

impl<B> Default for WatcherBuilder<B> {
    fn default() -> Self {
        Self::new()
    }
}
