use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};
use std::task::Waker;

use tracing::trace;

use super::Generation;

/// Function invoked when a slot completes.
///
/// Receives the registered context and the generation that completed. The
/// callee is expected to compare that generation against the step it has in
/// flight before touching any state.
pub type Callback = fn(Rc<dyn Any>, Generation);

/// A single continuation registered on a completion slot.
///
/// The callback form is a plain function pointer plus a weak context pointer,
/// so registering it never allocates and never keeps the owning iterator
/// alive on its own.
pub enum Continuation {
    /// Function pointer and context, used by iterators driving each other.
    Callback {
        callback: Callback,
        state: Weak<dyn Any>,
    },
    /// Task waker, used when a slot future is polled by an executor.
    Waker(Waker),
}

impl Continuation {
    /// Build a callback continuation whose context is `state`.
    pub fn new<T: Any>(callback: Callback, state: &Rc<T>) -> Self {
        let state: Weak<T> = Rc::downgrade(state);
        let state: Weak<dyn Any> = state;
        Self::Callback { callback, state }
    }

    /// Build a continuation that wakes a task.
    pub fn waker(waker: Waker) -> Self {
        Self::Waker(waker)
    }

    pub(crate) fn is_waker(&self) -> bool {
        matches!(self, Self::Waker(_))
    }

    /// Run the continuation for a completed generation.
    pub(crate) fn invoke(self, generation: Generation) {
        match self {
            Self::Callback { callback, state } => match state.upgrade() {
                Some(state) => callback(state, generation),
                None => trace!(generation, "continuation context dropped before completion"),
            },
            Self::Waker(waker) => waker.wake(),
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback { .. } => f.write_str("Continuation::Callback"),
            Self::Waker(_) => f.write_str("Continuation::Waker"),
        }
    }
}
