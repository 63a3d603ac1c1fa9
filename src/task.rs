use tracing_impl::Instrument;

use crate::{
    binding::{Binding, BindingEvent, BindingEventType},
    errors::{Result, WatchError},
    events::ChangeEvent,
    shared::{self, CancelRx, Shared, WorkerState},
    sink::Sink,
    subscription::WatchSubscription,
};

/// What the worker should do after a batch was handed to the sink.
enum Flow {
    Continue,
    SinkClosed,
}

/// Marks the worker stopped however its future ends, including when the
/// runtime drops it before it ran to completion.
struct StopOnDrop(Shared);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.set_state(WorkerState::Stopped);
    }
}

/// Counters reported when the worker exits.
#[derive(Debug, Default, Clone, Copy)]
struct Drained {
    batches: usize,
    emitted: usize,
    rearms: usize,
}

pub(crate) struct TaskState<B: Binding, S> {
    root_span: tracing_impl::Span,
    _exit: StopOnDrop,
    drained: Drained,
    cancel: CancelRx,
    subscription: WatchSubscription,
    wd: B::Identifier,
    binding: B,
    sink: S,
}

impl<B: Binding, S: Sink> TaskState<B, S> {
    /// Register the subscription with `binding`.
    ///
    /// Registration happens before the worker is launched so that any change
    /// after this returns is already queued by the facility.
    pub fn new(
        shared: Shared,
        cancel: CancelRx,
        subscription: WatchSubscription,
        mut binding: B,
        sink: S,
    ) -> Result<Self> {
        let root_span = tracing_impl::info_span!(
            "dirwatch_task",
            path = %subscription.directory().display()
        );

        let wd = binding.create(subscription.directory(), subscription.kinds())?;

        root_span.in_scope(|| tracing_impl::info!(kinds = ?subscription.kinds(), "Created"));

        Ok(Self {
            root_span,
            _exit: StopOnDrop(shared),
            drained: Drained::default(),
            cancel,
            subscription,
            wd,
            binding,
            sink,
        })
    }
}

impl<B, S> TaskState<B, S>
where
    B: Binding + Send + 'static,
    B::Identifier: Send,
    S: Sink,
{
    pub fn launch_in(self, runtime: tokio::runtime::Handle) -> tokio::task::JoinHandle<Result<()>> {
        let _guard = runtime.enter();

        let span = self.root_span.clone();

        tokio::spawn(self.worker().instrument(span))
    }
}

impl<B: Binding, S: Sink> TaskState<B, S> {
    async fn worker(mut self) -> Result<()> {
        tracing_impl::info!("Starting");

        let result = match self.drain().await {
            Err(WatchError::Interrupted) => {
                tracing_impl::info!("Stop requested");
                Ok(())
            }
            other => other,
        };

        if let Err(e) = self.binding.remove(self.wd) {
            tracing_impl::debug!(error = %e, "Watch was already gone");
        }

        let Drained {
            batches,
            emitted,
            rearms,
        } = self.drained;

        match &result {
            Ok(()) => tracing_impl::info!(batches, emitted, rearms, "Exiting"),
            Err(e) => {
                tracing_impl::error!(error = %e, batches, emitted, rearms, "Watch failed, exiting")
            }
        }

        // Dropping `self` flips the shared state to stopped.
        result
    }

    /// Wait for a batch, hand it to the sink, re-arm, repeat.
    ///
    /// Only returns through an error; a stop request surfaces as
    /// [`WatchError::Interrupted`].
    async fn drain(&mut self) -> Result<()> {
        loop {
            let batch = tokio::select! {
                biased;

                _ = shared::stopped(&mut self.cancel) => {
                    return Err(WatchError::Interrupted);
                },
                events = self.binding.events() => events?,
            };

            self.drained.batches += 1;
            tracing_impl::trace!(len = batch.len(), "Received batch");

            match self.handle_batch(batch).await? {
                Flow::Continue => {}
                Flow::SinkClosed => {
                    tracing_impl::info!("Sink was closed");
                    return Err(WatchError::Interrupted);
                }
            }

            self.binding
                .rearm(self.wd, self.subscription.directory(), self.subscription.kinds())?;

            self.drained.rearms += 1;
        }
    }

    /// Hand every requested change in `batch` to the sink.
    ///
    /// A stop request only cuts a batch short while the sink is making the
    /// worker wait; an accepting sink always receives the whole batch.
    async fn handle_batch(&mut self, batch: Vec<BindingEvent<B::Identifier>>) -> Result<Flow> {
        for event in batch.into_iter() {
            if event.wd != self.wd && !event.ty.contains(&BindingEventType::Overflow) {
                tracing_impl::debug!(wd = ?event.wd, "Event for unknown watch");
                continue;
            }

            for ty in event.ty.iter() {
                if ty.should_remove_watch() {
                    return Err(WatchError::Closed {
                        path: self.subscription.directory().to_path_buf(),
                    });
                }

                if *ty == BindingEventType::Overflow {
                    tracing_impl::warn!("Event queue overflowed, some changes were lost");
                    continue;
                }

                let (Some(kind), Some(path)) = (ty.kind(), event.path.as_ref()) else {
                    continue;
                };

                let change = ChangeEvent::new(kind, path);

                if !change.contained_in(&self.subscription.kinds()) {
                    continue;
                }

                tracing_impl::debug!(%change, "Emitting");

                let emitted = tokio::select! {
                    biased;

                    emitted = self.sink.emit(change) => emitted,
                    _ = shared::stopped(&mut self.cancel) => {
                        return Err(WatchError::Interrupted);
                    },
                };

                if emitted.is_err() {
                    return Ok(Flow::SinkClosed);
                }

                self.drained.emitted += 1;
            }
        }

        Ok(Flow::Continue)
    }
}
