use std::{
  io,
  pin::Pin,
  task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;

// Streams bytes while holding on to a guard. The guard is released as
// soon as the inner stream ends or fails, or when the stream is dropped
// before that (e.g. the client went away mid-transfer).
pub struct CleanupStream<T, G> {
  stream: T,
  guard: Option<G>,
}

impl<T, G> CleanupStream<T, G> {
  pub fn new(stream: T, guard: G) -> Self {
    CleanupStream {
      stream,
      guard: Some(guard),
    }
  }
}

impl<T, G> Stream for CleanupStream<T, G>
where
  T: Stream<Item = io::Result<Bytes>> + Unpin,
  G: Unpin,
{
  type Item = io::Result<Bytes>;

  fn poll_next(
    mut self: Pin<&mut Self>,
    cx: &mut Context<'_>,
  ) -> Poll<Option<Self::Item>> {
    let this = &mut *self;
    let poll = Pin::new(&mut this.stream).poll_next(cx);
    match poll {
      Poll::Ready(Some(Ok(bytes))) => Poll::Ready(Some(Ok(bytes))),
      Poll::Ready(Some(Err(err))) => {
        this.guard.take();
        Poll::Ready(Some(Err(err)))
      }
      Poll::Ready(None) => {
        this.guard.take();
        Poll::Ready(None)
      }
      Poll::Pending => Poll::Pending,
    }
  }
}
