use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use super::completion::{CompletionSlot, SlotStatus};
use super::continuation::Continuation;
use super::Generation;
use crate::error::PullError;

/// Anything that can back a [`SlotFuture`]: a generation-checked result with
/// continuation registration.
///
/// Iterators implement this by delegating to their own [`CompletionSlot`], so
/// the future they hand out points straight at the iterator and costs no
/// allocation.
pub trait CompletionSource<T> {
    fn get_status(&self, generation: Generation) -> Result<SlotStatus, PullError>;

    fn get_result(&self, generation: Generation) -> Result<T, PullError>;

    fn on_completed(
        &self,
        continuation: Continuation,
        generation: Generation,
    ) -> Result<(), PullError>;
}

impl<T: Clone> CompletionSource<T> for CompletionSlot<T> {
    fn get_status(&self, generation: Generation) -> Result<SlotStatus, PullError> {
        CompletionSlot::get_status(self, generation)
    }

    fn get_result(&self, generation: Generation) -> Result<T, PullError> {
        CompletionSlot::get_result(self, generation)
    }

    fn on_completed(
        &self,
        continuation: Continuation,
        generation: Generation,
    ) -> Result<(), PullError> {
        CompletionSlot::on_completed(self, continuation, generation)
    }
}

/// Single-shot future for one generation of a completion source.
///
/// Either already holds its outcome (synchronous fast path) or refers to a
/// source plus the generation it was issued for. It can be inspected and
/// continued by hand with [`is_completed`](Self::is_completed) and
/// [`on_completed`](Self::on_completed), or simply `.await`ed.
pub struct SlotFuture<T> {
    repr: Repr<T>,
}

enum Repr<T> {
    Ready(Result<T, PullError>),
    Source {
        source: Rc<dyn CompletionSource<T>>,
        generation: Generation,
    },
}

impl<T> SlotFuture<T> {
    /// A future that already succeeded with `value`.
    pub fn ready(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    /// A future that already failed with `err`.
    pub fn failed(err: PullError) -> Self {
        Self::from_result(Err(err))
    }

    /// A future that was already canceled.
    pub fn canceled() -> Self {
        Self::failed(PullError::Canceled)
    }

    pub fn from_result(result: Result<T, PullError>) -> Self {
        Self {
            repr: Repr::Ready(result),
        }
    }

    /// A future observing `generation` of `source`.
    pub fn new(source: Rc<dyn CompletionSource<T>>, generation: Generation) -> Self {
        Self {
            repr: Repr::Source { source, generation },
        }
    }

    /// Generation this future was issued for; `0` for ready futures.
    pub fn generation(&self) -> Generation {
        match &self.repr {
            Repr::Ready(_) => 0,
            Repr::Source { generation, .. } => *generation,
        }
    }

    /// Status of the observed generation.
    ///
    /// A source that has moved on to a later generation reports its error
    /// through [`result`](Self::result), so a stale future counts as
    /// completed here.
    pub fn status(&self) -> SlotStatus {
        match &self.repr {
            Repr::Ready(Ok(_)) => SlotStatus::Succeeded,
            Repr::Ready(Err(PullError::Canceled)) => SlotStatus::Canceled,
            Repr::Ready(Err(_)) => SlotStatus::Faulted,
            Repr::Source { source, generation } => source
                .get_status(*generation)
                .unwrap_or(SlotStatus::Faulted),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status().is_completed()
    }

    /// Consume the future and read its outcome.
    ///
    /// Only meaningful once [`is_completed`](Self::is_completed) returns
    /// `true`; a pending source yields [`PullError::NotYetCompleted`].
    pub fn result(self) -> Result<T, PullError> {
        match self.repr {
            Repr::Ready(result) => result,
            Repr::Source { source, generation } => source.get_result(generation),
        }
    }

    /// Register `continuation` for the observed generation.
    ///
    /// Runs it immediately when the outcome is already known.
    pub fn on_completed(&self, continuation: Continuation) -> Result<(), PullError> {
        match &self.repr {
            Repr::Ready(_) => {
                continuation.invoke(0);
                Ok(())
            }
            Repr::Source { source, generation } => source.on_completed(continuation, *generation),
        }
    }
}

impl<T: Clone> Clone for SlotFuture<T> {
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            Repr::Ready(result) => Repr::Ready(result.clone()),
            Repr::Source { source, generation } => Repr::Source {
                source: Rc::clone(source),
                generation: *generation,
            },
        };
        Self { repr }
    }
}

impl<T> std::fmt::Debug for SlotFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotFuture")
            .field("generation", &self.generation())
            .field("status", &self.status())
            .finish()
    }
}

// The value is never pinned in place; polling only reads through `&self`.
impl<T> Unpin for SlotFuture<T> {}

impl<T: Clone> Future for SlotFuture<T> {
    type Output = Result<T, PullError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &this.repr {
            Repr::Ready(result) => Poll::Ready(result.clone()),
            Repr::Source { source, generation } => {
                let status = match source.get_status(*generation) {
                    Ok(status) => status,
                    Err(err) => return Poll::Ready(Err(err)),
                };
                if status.is_completed() {
                    return Poll::Ready(source.get_result(*generation));
                }
                match source.on_completed(Continuation::waker(cx.waker().clone()), *generation) {
                    Ok(()) => Poll::Pending,
                    Err(err) => Poll::Ready(Err(err)),
                }
            }
        }
    }
}
