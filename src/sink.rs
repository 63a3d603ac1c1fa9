use std::future::{ready, Future};
use std::io::Write;

use tokio::sync::mpsc;

use crate::errors::SinkClosed;
use crate::events::ChangeEvent;

/// Destination for the events drained by a watch worker.
///
/// Called from the worker once per event, in the order the facility reported
/// them. A sink may make the worker wait (a full bounded channel does); the
/// worker gives up waiting only when a stop is requested. Resolving to
/// [`SinkClosed`] stops the worker.
pub trait Sink: Send + 'static {
    fn emit(&mut self, event: ChangeEvent) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

impl<F> Sink for F
where
    F: FnMut(ChangeEvent) -> Result<(), SinkClosed> + Send + 'static,
{
    fn emit(&mut self, event: ChangeEvent) -> impl Future<Output = Result<(), SinkClosed>> + Send {
        ready(self(event))
    }
}

impl Sink for mpsc::UnboundedSender<ChangeEvent> {
    fn emit(&mut self, event: ChangeEvent) -> impl Future<Output = Result<(), SinkClosed>> + Send {
        ready(self.send(event).map_err(|_| SinkClosed))
    }
}

/// Waits for room in the channel, a slow consumer holds the worker back
/// instead of losing events.
impl Sink for mpsc::Sender<ChangeEvent> {
    fn emit(&mut self, event: ChangeEvent) -> impl Future<Output = Result<(), SinkClosed>> + Send {
        let tx = &*self;

        async move { tx.send(event).await.map_err(|_| SinkClosed) }
    }
}

/// Writes one line per event to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stdout;

impl Sink for Stdout {
    fn emit(&mut self, event: ChangeEvent) -> impl Future<Output = Result<(), SinkClosed>> + Send {
        ready(writeln!(std::io::stdout().lock(), "{event}").map_err(|_| SinkClosed))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn closures_are_sinks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = move |event: ChangeEvent| tx.send(event).map_err(|_| SinkClosed);

        sink.emit(ChangeEvent::new(EventKind::Created, "a.txt"))
            .await
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            ChangeEvent::new(EventKind::Created, "a.txt")
        );
    }

    #[tokio::test]
    async fn dropped_receiver_closes_the_sink() {
        let (mut tx, rx) = mpsc::unbounded_channel::<ChangeEvent>();
        drop(rx);

        assert_eq!(
            tx.emit(ChangeEvent::new(EventKind::Deleted, "a.txt")).await,
            Err(SinkClosed)
        );
    }

    #[tokio::test]
    async fn full_bounded_channel_waits_for_room() {
        let (mut tx, mut rx) = mpsc::channel::<ChangeEvent>(1);

        tx.emit(ChangeEvent::new(EventKind::Created, "a"))
            .await
            .unwrap();

        let mut blocked = tx.clone();
        let second = tokio::spawn(async move {
            blocked
                .emit(ChangeEvent::new(EventKind::Created, "b"))
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!second.is_finished());

        assert_eq!(rx.recv().await.unwrap().path, std::path::PathBuf::from("a"));
        assert_eq!(second.await.unwrap(), Ok(()));
        assert_eq!(rx.recv().await.unwrap().path, std::path::PathBuf::from("b"));

        drop(rx);
        assert_eq!(
            tx.emit(ChangeEvent::new(EventKind::Created, "c")).await,
            Err(SinkClosed)
        );
    }
}
