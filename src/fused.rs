//! Iterator with an asynchronous transform fused into every step.
//!
//! [`Fused`] pulls an element from its upstream, hands it to a [`Transform`]
//! that returns a [`SlotFuture`], and once that future completes asks the same
//! hook whether the transformed value becomes the current element or is
//! skipped. Each round through the driving loop ends in one of the three
//! [`Step`] outcomes.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::PullError;
use crate::pull::{AsyncPull, AsyncSource};
use crate::session::Session;
use crate::slot::{CompletionSource, Continuation, Generation, SlotFuture, SlotStatus};
use crate::step::Step;

/// Per-element hooks of a [`Fused`] iterator.
pub trait Transform<T> {
    /// Value produced by the asynchronous part of the transform.
    type Awaited: Clone + 'static;
    /// Element exposed through [`AsyncPull::current`].
    type Output: Clone;

    /// Start transforming `item`.
    fn transform(&mut self, item: T) -> anyhow::Result<SlotFuture<Self::Awaited>>;

    /// Accept a transformed value as the next element, or return `None` to
    /// skip it and pull again.
    fn try_set_current(&mut self, awaited: Self::Awaited) -> anyhow::Result<Option<Self::Output>>;
}

/// [`Transform`] hooks built from two closures. Created by [`transform_fn`].
pub struct TransformFn<F, G> {
    transform: F,
    accept: G,
}

impl<T, A, U, F, G> Transform<T> for TransformFn<F, G>
where
    A: Clone + 'static,
    U: Clone,
    F: FnMut(T) -> anyhow::Result<SlotFuture<A>>,
    G: FnMut(A) -> anyhow::Result<Option<U>>,
{
    type Awaited = A;
    type Output = U;

    fn transform(&mut self, item: T) -> anyhow::Result<SlotFuture<A>> {
        (self.transform)(item)
    }

    fn try_set_current(&mut self, awaited: A) -> anyhow::Result<Option<U>> {
        (self.accept)(awaited)
    }
}

/// Create [`Transform`] hooks from a transform closure and an accept closure.
///
/// ```rust
/// use pullcore::slot::SlotFuture;
/// use pullcore::{Transform, transform_fn};
///
/// let mut squares_over_ten = transform_fn(
///     |v: u32| Ok(SlotFuture::ready(v * v)),
///     |sq: u32| Ok((sq > 10).then_some(sq)),
/// );
/// let pending = squares_over_ten.transform(4).unwrap();
/// let squared = pending.result().unwrap();
/// assert_eq!(squares_over_ten.try_set_current(squared).unwrap(), Some(16));
/// ```
pub fn transform_fn<T, A, U, F, G>(transform: F, accept: G) -> TransformFn<F, G>
where
    F: FnMut(T) -> anyhow::Result<SlotFuture<A>>,
    G: FnMut(A) -> anyhow::Result<Option<U>>,
{
    TransformFn { transform, accept }
}

/// Pull session over `S` whose elements go through the transform `X`.
pub struct Fused<S, X>
where
    S: AsyncSource,
    X: Transform<S::Item>,
{
    inner: Rc<Inner<S, X>>,
}

struct Inner<S, X>
where
    S: AsyncSource,
    X: Transform<S::Item>,
{
    session: Session<S, X::Output>,
    hook: RefCell<X>,
    transform_next: RefCell<Option<SlotFuture<X::Awaited>>>,
}

impl<S, X> Fused<S, X>
where
    S: AsyncSource + 'static,
    X: Transform<S::Item> + 'static,
{
    pub fn new(source: S, hook: X, cancel: CancellationToken) -> Self {
        Self {
            inner: Rc::new(Inner {
                session: Session::new(source, cancel),
                hook: RefCell::new(hook),
                transform_next: RefCell::new(None),
            }),
        }
    }

    /// Status of the pull most recently started.
    pub fn status(&self) -> SlotStatus {
        self.inner.session.slot().status()
    }
}

impl<S, X> Inner<S, X>
where
    S: AsyncSource + 'static,
    X: Transform<S::Item> + 'static,
{
    fn pull_upstream(this: &Rc<Self>) {
        loop {
            let next = this.session.request_upstream();
            if !next.is_completed() {
                let continuation = Continuation::new(Self::on_upstream_completed, this);
                if let Err(err) = this.session.park_upstream(next, continuation) {
                    this.session.fault(err);
                }
                return;
            }

            match Self::step(this, next.result()) {
                Ok(Step::Wait) => return,
                Ok(Step::Retry) => continue,
                Ok(Step::Done(outcome)) => return this.finish(outcome),
                Err(err) => return this.session.fault(err),
            }
        }
    }

    fn on_upstream_completed(state: Rc<dyn Any>, generation: Generation) {
        let Ok(this) = state.downcast::<Self>() else {
            return;
        };
        let Some(next) = this.session.take_upstream_next(generation) else {
            return;
        };

        trace!(generation, "upstream step completed asynchronously");
        match Self::step(&this, next.result()) {
            Ok(Step::Wait) => {}
            Ok(Step::Retry) => Self::pull_upstream(&this),
            Ok(Step::Done(outcome)) => this.finish(outcome),
            Err(err) => this.session.fault(err),
        }
    }

    fn on_transform_completed(state: Rc<dyn Any>, generation: Generation) {
        let Ok(this) = state.downcast::<Self>() else {
            return;
        };
        let Some(transformed) = this.take_transform(generation) else {
            return;
        };

        trace!(generation, "transform completed asynchronously");
        match this.accept(transformed.result()) {
            Ok(Some(value)) => this.finish(Some(value)),
            Ok(None) => Self::pull_upstream(&this),
            Err(err) => this.session.fault(err),
        }
    }

    /// Run one element through the transform.
    fn step(
        this: &Rc<Self>,
        has_next: Result<bool, PullError>,
    ) -> Result<Step<X::Output>, PullError> {
        if !has_next? {
            return Ok(Step::Done(None));
        }
        let Some(item) = this.session.upstream_current() else {
            return Err(PullError::missing_current());
        };

        let pending = this.hook.borrow_mut().transform(item)?;
        if pending.is_completed() {
            return Ok(match this.accept(pending.result())? {
                Some(value) => Step::Done(Some(value)),
                None => Step::Retry,
            });
        }

        trace!(generation = pending.generation(), "transform pending; suspending");
        let handle = pending.clone();
        *this.transform_next.borrow_mut() = Some(pending);
        this.session.suspend();
        handle.on_completed(Continuation::new(Self::on_transform_completed, this))?;
        Ok(Step::Wait)
    }

    fn accept(
        &self,
        transformed: Result<X::Awaited, PullError>,
    ) -> Result<Option<X::Output>, PullError> {
        let awaited = transformed?;
        Ok(self.hook.borrow_mut().try_set_current(awaited)?)
    }

    fn take_transform(&self, generation: Generation) -> Option<SlotFuture<X::Awaited>> {
        let mut parked = self.transform_next.borrow_mut();
        if !matches!(parked.as_ref(), Some(pending) if pending.generation() == generation) {
            trace!(generation, "ignoring stale transform completion");
            return None;
        }
        if !self.session.resume(generation) {
            return None;
        }
        parked.take()
    }

    /// Only an accepted element observes cancellation; exhaustion always
    /// resolves `false`.
    fn finish(&self, outcome: Option<X::Output>) {
        let check_cancel = outcome.is_some();
        self.session.resolve(outcome, check_cancel);
    }
}

impl<S, X> CompletionSource<bool> for Inner<S, X>
where
    S: AsyncSource,
    X: Transform<S::Item>,
{
    fn get_status(&self, generation: Generation) -> Result<SlotStatus, PullError> {
        self.session.slot().get_status(generation)
    }

    fn get_result(&self, generation: Generation) -> Result<bool, PullError> {
        self.session.slot().get_result(generation)
    }

    fn on_completed(
        &self,
        continuation: Continuation,
        generation: Generation,
    ) -> Result<(), PullError> {
        self.session.slot().on_completed(continuation, generation)
    }
}

impl<S, X> AsyncPull for Fused<S, X>
where
    S: AsyncSource + 'static,
    X: Transform<S::Item> + 'static,
{
    type Item = X::Output;

    fn get_next(&self) -> SlotFuture<bool> {
        let generation = match self.inner.session.begin() {
            Ok(generation) => generation,
            Err(err) => return SlotFuture::failed(err),
        };
        Inner::pull_upstream(&self.inner);
        let source: Rc<dyn CompletionSource<bool>> = self.inner.clone();
        SlotFuture::new(source, generation)
    }

    fn current(&self) -> Option<X::Output> {
        self.inner.session.current()
    }

    fn dispose(&self) -> SlotFuture<()> {
        let parked = self.inner.transform_next.borrow_mut().take();
        drop(parked);
        self.inner.session.dispose()
    }
}

/// Source producing a fresh [`Fused`] per enumeration.
pub struct FusedSource<S, F> {
    source: S,
    hook: F,
}

/// Build a [`FusedSource`] over `source`, calling `hook` for every new
/// enumeration.
pub fn fused<S, F, X>(source: S, hook: F) -> FusedSource<S, F>
where
    S: AsyncSource + Clone + 'static,
    F: Fn() -> X,
    X: Transform<S::Item> + 'static,
{
    FusedSource { source, hook }
}

impl<S, F, X> AsyncSource for FusedSource<S, F>
where
    S: AsyncSource + Clone + 'static,
    F: Fn() -> X,
    X: Transform<S::Item> + 'static,
{
    type Item = X::Output;
    type Pull = Fused<S, X>;

    fn pull(&self, cancel: CancellationToken) -> Self::Pull {
        Fused::new(self.source.clone(), (self.hook)(), cancel)
    }
}

impl<S: Clone, F: Clone> Clone for FusedSource<S, F> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            hook: self.hook.clone(),
        }
    }
}
