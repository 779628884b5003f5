use std::cell::{Cell, RefCell};
use std::sync::Arc;

use tracing::trace;

use super::continuation::Continuation;
use super::Generation;
use crate::error::{Fault, PullError};

/// Status of one generation of a completion slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    Pending,
    Succeeded,
    Faulted,
    Canceled,
}

impl SlotStatus {
    /// Returns `true` once the generation reached a terminal state.
    pub fn is_completed(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Terminal outcome written into a slot.
#[derive(Debug)]
pub enum Completion<T> {
    Succeeded(T),
    Faulted(Fault),
    Canceled,
}

impl<T> From<PullError> for Completion<T> {
    fn from(err: PullError) -> Self {
        match err {
            PullError::Canceled => Self::Canceled,
            PullError::Faulted(fault) => Self::Faulted(fault),
            other => Self::Faulted(Arc::new(anyhow::Error::new(other))),
        }
    }
}

enum SlotState<T> {
    Pending,
    Succeeded(T),
    Faulted(Fault),
    Canceled,
}

impl<T> SlotState<T> {
    fn status(&self) -> SlotStatus {
        match self {
            Self::Pending => SlotStatus::Pending,
            Self::Succeeded(_) => SlotStatus::Succeeded,
            Self::Faulted(_) => SlotStatus::Faulted,
            Self::Canceled => SlotStatus::Canceled,
        }
    }
}

/// Reusable single-shot result holder.
///
/// One terminal write is accepted per generation; later writes are ignored.
/// [`reset`](Self::reset) starts a new generation and drops whatever result
/// and continuation the previous one held. All state lives inline, so
/// completing and reading a slot never allocates.
///
/// ```rust
/// use pullcore::slot::{CompletionSlot, SlotStatus};
///
/// let slot = CompletionSlot::new();
/// slot.reset();
/// let generation = slot.generation();
///
/// assert!(slot.try_set_result(true));
/// assert!(!slot.try_set_result(false)); // first writer wins
/// assert_eq!(slot.get_status(generation).unwrap(), SlotStatus::Succeeded);
/// assert_eq!(slot.get_result(generation).unwrap(), true);
///
/// slot.reset();
/// assert!(slot.get_result(generation).is_err()); // stale generation
/// ```
pub struct CompletionSlot<T> {
    generation: Cell<Generation>,
    state: RefCell<SlotState<T>>,
    continuation: RefCell<Option<Continuation>>,
}

impl<T> Default for CompletionSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompletionSlot<T> {
    pub fn new() -> Self {
        Self {
            generation: Cell::new(0),
            state: RefCell::new(SlotState::Pending),
            continuation: RefCell::new(None),
        }
    }

    /// Generation of the current use of the slot.
    pub fn generation(&self) -> Generation {
        self.generation.get()
    }

    /// Status of the current generation.
    pub fn status(&self) -> SlotStatus {
        self.state.borrow().status()
    }

    /// Start a new generation, discarding result and continuation.
    ///
    /// Must not be called while a continuation of the current generation is
    /// still expected to fire; that continuation is dropped here.
    pub fn reset(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
        *self.state.borrow_mut() = SlotState::Pending;
        let dropped = self.continuation.borrow_mut().take();
        drop(dropped);
    }

    fn validate(&self, generation: Generation) -> Result<(), PullError> {
        let current = self.generation.get();
        if generation == current {
            Ok(())
        } else {
            Err(PullError::InvalidGeneration {
                requested: generation,
                current,
            })
        }
    }

    pub fn get_status(&self, generation: Generation) -> Result<SlotStatus, PullError> {
        self.validate(generation)?;
        Ok(self.status())
    }

    /// Read the outcome of `generation`.
    pub fn get_result(&self, generation: Generation) -> Result<T, PullError>
    where
        T: Clone,
    {
        self.validate(generation)?;
        match &*self.state.borrow() {
            SlotState::Succeeded(value) => Ok(value.clone()),
            SlotState::Faulted(fault) => Err(match fault.downcast_ref::<PullError>() {
                Some(err) => err.clone(),
                None => PullError::Faulted(Arc::clone(fault)),
            }),
            SlotState::Canceled => Err(PullError::Canceled),
            SlotState::Pending => Err(PullError::NotYetCompleted(generation)),
        }
    }

    /// Register the continuation to run when `generation` completes.
    ///
    /// An already completed generation runs the continuation immediately. A
    /// waker may replace an earlier waker (re-polling); any other second
    /// registration is rejected.
    pub fn on_completed(
        &self,
        continuation: Continuation,
        generation: Generation,
    ) -> Result<(), PullError> {
        self.validate(generation)?;
        if self.status().is_completed() {
            continuation.invoke(generation);
            return Ok(());
        }

        let mut registered = self.continuation.borrow_mut();
        match registered.as_ref() {
            Some(existing) if !(existing.is_waker() && continuation.is_waker()) => {
                Err(PullError::ContinuationAlreadyRegistered(generation))
            }
            _ => {
                *registered = Some(continuation);
                Ok(())
            }
        }
    }

    /// Write the terminal outcome of `generation`.
    ///
    /// Returns `false` without side effects when `generation` is stale or the
    /// generation already completed. Otherwise the registered continuation,
    /// if any, runs before this returns.
    pub fn try_complete(&self, generation: Generation, completion: Completion<T>) -> bool {
        if generation != self.generation.get() {
            trace!(
                generation,
                current = self.generation.get(),
                "ignoring completion for stale generation"
            );
            return false;
        }

        {
            let mut state = self.state.borrow_mut();
            if state.status().is_completed() {
                return false;
            }
            *state = match completion {
                Completion::Succeeded(value) => SlotState::Succeeded(value),
                Completion::Faulted(fault) => SlotState::Faulted(fault),
                Completion::Canceled => SlotState::Canceled,
            };
        }

        let continuation = self.continuation.borrow_mut().take();
        if let Some(continuation) = continuation {
            continuation.invoke(generation);
        }
        true
    }

    pub fn try_set_result(&self, value: T) -> bool {
        self.try_complete(self.generation(), Completion::Succeeded(value))
    }

    pub fn try_set_exception(&self, error: impl Into<anyhow::Error>) -> bool {
        self.try_complete(
            self.generation(),
            Completion::Faulted(Arc::new(error.into())),
        )
    }

    pub fn try_set_canceled(&self) -> bool {
        self.try_complete(self.generation(), Completion::Canceled)
    }
}
