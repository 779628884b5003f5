//! [`futures::Stream`] view of a pull session.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use futures::stream::FusedStream;

use crate::error::PullError;
use crate::pull::AsyncPull;
use crate::slot::SlotFuture;

/// Yields the elements of a pull session as a stream.
///
/// The stream ends after exhaustion or after yielding the first error. It
/// does not dispose the session; take it back with
/// [`into_inner`](Self::into_inner) to do so.
pub struct PullStream<P> {
    pull: P,
    pending: Option<SlotFuture<bool>>,
    done: bool,
}

impl<P: AsyncPull> PullStream<P> {
    pub fn new(pull: P) -> Self {
        Self {
            pull,
            pending: None,
            done: false,
        }
    }

    pub fn get_ref(&self) -> &P {
        &self.pull
    }

    pub fn into_inner(self) -> P {
        self.pull
    }
}

impl<P: AsyncPull + Unpin> Stream for PullStream<P> {
    type Item = Result<P::Item, PullError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        let this = &mut *self;
        let pending = this.pending.get_or_insert_with(|| this.pull.get_next());
        let has_next = match Pin::new(pending).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(has_next) => has_next,
        };
        this.pending = None;

        match has_next {
            Ok(true) => match this.pull.current() {
                Some(item) => Poll::Ready(Some(Ok(item))),
                None => {
                    this.done = true;
                    Poll::Ready(Some(Err(PullError::missing_current())))
                }
            },
            Ok(false) => {
                this.done = true;
                Poll::Ready(None)
            }
            Err(err) => {
                this.done = true;
                Poll::Ready(Some(Err(err)))
            }
        }
    }
}

impl<P: AsyncPull + Unpin> FusedStream for PullStream<P> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

/// Extension methods for [`AsyncPull`].
pub trait AsyncPullExt: AsyncPull {
    /// Consume the session as a [`Stream`].
    ///
    /// ```rust
    /// use futures::StreamExt;
    /// use futures::executor::block_on;
    /// use pullcore::{AsyncPullExt, AsyncSource, from_iter};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// let stream = from_iter(["a", "b"]).pull(CancellationToken::new()).into_stream();
    /// let items: Vec<_> = block_on(stream.collect());
    /// assert_eq!(items.len(), 2);
    /// ```
    fn into_stream(self) -> PullStream<Self>
    where
        Self: Sized,
    {
        PullStream::new(self)
    }
}

impl<P: AsyncPull> AsyncPullExt for P {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fused::{Fused, transform_fn};
    use crate::pull::AsyncSource;
    use crate::source::from_iter;
    use crate::testing::{HollowPull, ManualSource};
    use futures::StreamExt;
    use futures::executor::block_on;
    use futures::task::noop_waker;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_yields_until_exhausted() {
        let pull = Fused::new(
            from_iter(1..=6_u32),
            transform_fn(
                |v: u32| Ok(SlotFuture::ready(v)),
                |v: u32| Ok((v % 3 == 0).then_some(v)),
            ),
            CancellationToken::new(),
        );
        let mut stream = pull.into_stream();
        let items: Vec<u32> = block_on((&mut stream).map(Result::unwrap).collect());
        assert_eq!(items, vec![3, 6]);
        assert!(stream.is_terminated());
    }

    #[test]
    fn test_ends_after_first_error() {
        let pull = Fused::new(
            from_iter(1..=3_u32),
            transform_fn(
                |v: u32| {
                    anyhow::ensure!(v != 2, "bad element");
                    Ok(SlotFuture::ready(v))
                },
                |v: u32| Ok(Some(v)),
            ),
            CancellationToken::new(),
        );
        let items: Vec<_> = block_on(pull.into_stream().collect());
        assert_eq!(items.len(), 2);
        assert_eq!(*items[0].as_ref().unwrap(), 1);
        assert!(items[1].is_err());
    }

    #[test]
    fn test_pending_step_is_reused_across_polls() {
        let source = ManualSource::new([5_u32]);
        let mut stream = source.pull(CancellationToken::new()).into_stream();

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(stream.poll_next_unpin(&mut cx).is_pending());
        assert!(stream.poll_next_unpin(&mut cx).is_pending());

        source.complete_next();
        match stream.poll_next_unpin(&mut cx) {
            Poll::Ready(Some(Ok(5))) => {}
            other => panic!("unexpected poll result: {other:?}"),
        }
        assert!(stream.poll_next_unpin(&mut cx).is_pending());
        source.complete_next();
        assert!(matches!(stream.poll_next_unpin(&mut cx), Poll::Ready(None)));
        assert!(matches!(stream.poll_next_unpin(&mut cx), Poll::Ready(None)));
    }

    #[test]
    fn test_missing_current_is_reported() {
        let mut stream = HollowPull::default().into_stream();
        let first = block_on(stream.next());
        assert!(matches!(first, Some(Err(PullError::Faulted(_)))));
        assert!(stream.is_terminated());
        assert!(block_on(stream.next()).is_none());
    }
}
