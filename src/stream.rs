use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::mpsc::Receiver;
use tokio_stream::{wrappers::ReceiverStream, Stream};

use crate::events::ChangeEvent;

/// Stream of the changes drained by a watch worker.
///
/// Ends once the worker stops. A full buffer holds the worker back until the
/// stream is read; dropping the stream closes the sink, which stops the worker.
#[derive(Debug)]
pub struct ChangeStream {
    inner: ReceiverStream<ChangeEvent>,
}

impl ChangeStream {
    pub(crate) fn new(rx: Receiver<ChangeEvent>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
        }
    }

    /// Receive the next change, or `None` once the worker has stopped.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.inner.as_mut().recv().await
    }
}

impl Stream for ChangeStream {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
