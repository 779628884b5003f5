use std::rc::Rc;

use super::completion::{CompletionSlot, SlotStatus};
use super::future::{CompletionSource, SlotFuture};
use super::Generation;

/// Shared, resettable completion source.
///
/// The producer side of a [`SlotFuture`] for code that is not itself an
/// iterator: hand-written sources, asynchronous transforms, tests standing in
/// for a scheduler. Clones share the same slot. The slot is allocated once in
/// [`new`](Self::new) and reused by every [`reset`](Self::reset).
///
/// ```rust
/// use pullcore::slot::Promise;
///
/// let promise = Promise::new();
/// let future = promise.future();
/// assert!(!future.is_completed());
///
/// promise.try_set_result(42);
/// assert_eq!(future.result().unwrap(), 42);
/// ```
pub struct Promise<T> {
    slot: Rc<CompletionSlot<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: Clone + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Create a promise whose first generation is already pending.
    pub fn new() -> Self {
        let slot = Rc::new(CompletionSlot::new());
        slot.reset();
        Self { slot }
    }

    /// Future for the current generation.
    pub fn future(&self) -> SlotFuture<T> {
        let source: Rc<dyn CompletionSource<T>> = self.slot.clone();
        SlotFuture::new(source, self.slot.generation())
    }

    /// Start a new generation; futures handed out earlier become stale.
    pub fn reset(&self) {
        self.slot.reset();
    }

    pub fn generation(&self) -> Generation {
        self.slot.generation()
    }

    pub fn status(&self) -> SlotStatus {
        self.slot.status()
    }

    pub fn try_set_result(&self, value: T) -> bool {
        self.slot.try_set_result(value)
    }

    pub fn try_set_exception(&self, error: impl Into<anyhow::Error>) -> bool {
        self.slot.try_set_exception(error)
    }

    pub fn try_set_canceled(&self) -> bool {
        self.slot.try_set_canceled()
    }
}
