use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use tokio::sync::watch;

/// Lifecycle of a watch worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for the next batch of events, or processing one
    Running,
    /// Loop exited, either on request or because the facility failed
    Stopped,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Running,
            _ => WorkerState::Stopped,
        }
    }
}

/// Receiving half of the stop signal, owned by the worker.
pub(crate) type CancelRx = watch::Receiver<bool>;

/// State shared between the worker and every handle to it.
#[derive(Debug)]
pub(crate) struct SharedState {
    state: AtomicU8,
    cancel: watch::Sender<bool>,
}

impl SharedState {
    pub fn new() -> (Arc<Self>, CancelRx) {
        let (cancel, rx) = watch::channel(false);

        let shared = Self {
            state: AtomicU8::new(WorkerState::Running as u8),
            cancel,
        };

        (Arc::new(shared), rx)
    }

    /// Request the worker to stop. Returns whether this call made the request.
    pub fn send_stop(&self) -> bool {
        !self.cancel.send_replace(true)
    }

    pub fn stop_requested(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

pub(crate) type Shared = Arc<SharedState>;

/// Resolves once a stop was requested.
pub(crate) async fn stopped(cancel: &mut CancelRx) {
    loop {
        let stop = *cancel.borrow_and_update();

        if stop {
            return;
        }

        if cancel.changed().await.is_err() {
            // Every sender is gone, nobody can ask us to stop anymore.
            std::future::pending::<()>().await;
        }
    }
}
