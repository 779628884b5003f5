//! State shared by the sequential and fused iterators.
//!
//! A session owns the outer completion slot, the lazily started upstream
//! enumeration and the upstream step currently in flight. The iterators own
//! the driving loop; the session only knows how to start a pull, park on the
//! upstream, and resolve.

use std::cell::{Cell, RefCell};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::PullError;
use crate::pull::{AsyncPull, AsyncSource};
use crate::slot::{Completion, CompletionSlot, Continuation, Generation, SlotFuture};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    /// No pull running; the last one produced an element, or none was issued.
    Idle,
    /// Inside the driving loop.
    Pulling,
    /// Waiting for a continuation from upstream or from a transform.
    Suspended,
    /// The last pull reported exhaustion.
    Completed,
    /// A pull faulted or was canceled.
    Terminated,
    Disposed,
}

pub(crate) struct Session<S: AsyncSource, T> {
    source: S,
    cancel: CancellationToken,
    slot: CompletionSlot<bool>,
    phase: Cell<Phase>,
    upstream: RefCell<Option<S::Pull>>,
    upstream_next: RefCell<Option<SlotFuture<bool>>>,
    current: RefCell<Option<T>>,
}

impl<S: AsyncSource, T: Clone> Session<S, T> {
    pub(crate) fn new(source: S, cancel: CancellationToken) -> Self {
        Self {
            source,
            cancel,
            slot: CompletionSlot::new(),
            phase: Cell::new(Phase::Idle),
            upstream: RefCell::new(None),
            upstream_next: RefCell::new(None),
            current: RefCell::new(None),
        }
    }

    pub(crate) fn slot(&self) -> &CompletionSlot<bool> {
        &self.slot
    }

    pub(crate) fn current(&self) -> Option<T> {
        self.current.borrow().clone()
    }

    /// Validate the session, start the upstream on first use and open a new
    /// generation of the outer slot.
    pub(crate) fn begin(&self) -> Result<Generation, PullError> {
        match self.phase.get() {
            Phase::Pulling | Phase::Suspended => return Err(PullError::PullInFlight),
            Phase::Terminated => return Err(PullError::Terminated),
            Phase::Disposed => return Err(PullError::Disposed),
            Phase::Idle | Phase::Completed => {}
        }

        {
            let mut upstream = self.upstream.borrow_mut();
            if upstream.is_none() {
                debug!("starting upstream enumeration");
                *upstream = Some(self.source.pull(self.cancel.clone()));
            }
        }

        self.slot.reset();
        self.phase.set(Phase::Pulling);
        Ok(self.slot.generation())
    }

    /// Ask the upstream for its next element.
    pub(crate) fn request_upstream(&self) -> SlotFuture<bool> {
        match self.upstream.borrow().as_ref() {
            Some(upstream) => upstream.get_next(),
            None => SlotFuture::failed(PullError::Disposed),
        }
    }

    pub(crate) fn upstream_current(&self) -> Option<S::Item> {
        self.upstream
            .borrow()
            .as_ref()
            .and_then(|upstream| upstream.current())
    }

    /// Keep the pending upstream step and register `continuation` on it.
    pub(crate) fn park_upstream(
        &self,
        next: SlotFuture<bool>,
        continuation: Continuation,
    ) -> Result<(), PullError> {
        trace!(generation = next.generation(), "upstream pending; suspending");
        let handle = next.clone();
        *self.upstream_next.borrow_mut() = Some(next);
        self.suspend();
        handle.on_completed(continuation)
    }

    /// Take the parked upstream step if `generation` is the one in flight.
    pub(crate) fn take_upstream_next(&self, generation: Generation) -> Option<SlotFuture<bool>> {
        if self.phase.get() != Phase::Suspended {
            trace!(generation, phase = ?self.phase.get(), "ignoring upstream completion");
            return None;
        }
        let mut parked = self.upstream_next.borrow_mut();
        match parked.as_ref() {
            Some(next) if next.generation() == generation => {
                self.phase.set(Phase::Pulling);
                parked.take()
            }
            _ => {
                trace!(generation, "ignoring stale upstream completion");
                None
            }
        }
    }

    pub(crate) fn suspend(&self) {
        self.phase.set(Phase::Suspended);
    }

    /// Resume after a parked step other than the upstream one completed.
    pub(crate) fn resume(&self, generation: Generation) -> bool {
        if self.phase.get() == Phase::Suspended {
            self.phase.set(Phase::Pulling);
            true
        } else {
            trace!(generation, phase = ?self.phase.get(), "ignoring completion");
            false
        }
    }

    /// Finish the pull in flight.
    ///
    /// `Some` publishes a new current element and resolves `true`, `None`
    /// resolves `false`. With `check_cancel` the cancellation signal is
    /// consulted first and wins over the outcome.
    pub(crate) fn resolve(&self, outcome: Option<T>, check_cancel: bool) {
        if self.phase.get() == Phase::Disposed {
            trace!("session disposed during the pull; outcome dropped");
            return;
        }
        if check_cancel && self.cancel.is_cancelled() {
            debug!("cancellation observed; pull canceled");
            self.phase.set(Phase::Terminated);
            self.slot.try_set_canceled();
            return;
        }

        let has_current = outcome.is_some();
        *self.current.borrow_mut() = outcome;
        self.phase
            .set(if has_current { Phase::Idle } else { Phase::Completed });
        self.slot.try_set_result(has_current);
    }

    /// Finish the pull in flight with an error.
    pub(crate) fn fault(&self, err: PullError) {
        debug!(error = %err, "pull failed");
        if self.phase.get() != Phase::Disposed {
            self.phase.set(Phase::Terminated);
        }
        self.slot
            .try_complete(self.slot.generation(), Completion::from(err));
    }

    /// Dispose the session, forwarding to the upstream if one was started.
    pub(crate) fn dispose(&self) -> SlotFuture<()> {
        let previous = self.phase.replace(Phase::Disposed);
        if previous == Phase::Disposed {
            return SlotFuture::ready(());
        }

        let parked = self.upstream_next.borrow_mut().take();
        drop(parked);
        let upstream = self.upstream.borrow_mut().take();

        if matches!(previous, Phase::Pulling | Phase::Suspended) {
            debug!("disposed with a pull in flight");
            self.slot
                .try_complete(self.slot.generation(), Completion::from(PullError::Disposed));
        }

        match upstream {
            Some(upstream) => {
                debug!("forwarding disposal to upstream");
                upstream.dispose()
            }
            None => SlotFuture::ready(()),
        }
    }
}
