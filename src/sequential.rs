//! Iterator that pulls from an upstream and decides per element.
//!
//! [`Sequential`] drives an upstream [`AsyncPull`] in a loop, handing every
//! element to a [`MoveNext`] hook that either accepts it, skips it, or ends
//! the sequence. Upstream steps that complete synchronously are consumed in
//! the same loop without recursion; only a pending step suspends the pull.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::PullError;
use crate::pull::{AsyncPull, AsyncSource};
use crate::session::Session;
use crate::slot::{CompletionSource, Continuation, Generation, SlotFuture, SlotStatus};
use crate::step::Advance;

/// Per-element decision hook of a [`Sequential`] iterator.
pub trait MoveNext<T> {
    type Output: Clone;

    /// Decide what to do with the next upstream element, `None` once the
    /// upstream is exhausted. Errors fault the pull.
    fn try_move_next(&mut self, item: Option<T>) -> anyhow::Result<Advance<Self::Output>>;
}

/// [`MoveNext`] hook built from a closure. Created by [`advance_fn`].
pub struct AdvanceFn<F>(F);

impl<T, U, F> MoveNext<T> for AdvanceFn<F>
where
    U: Clone,
    F: FnMut(Option<T>) -> anyhow::Result<Advance<U>>,
{
    type Output = U;

    fn try_move_next(&mut self, item: Option<T>) -> anyhow::Result<Advance<U>> {
        (self.0)(item)
    }
}

/// Create a [`MoveNext`] hook from a closure.
///
/// ```rust
/// use pullcore::{Advance, MoveNext, advance_fn};
///
/// let mut evens = advance_fn(|item: Option<u32>| {
///     Ok(match item {
///         Some(v) if v % 2 == 0 => Advance::Done(Some(v)),
///         Some(_) => Advance::Continue,
///         None => Advance::Done(None),
///     })
/// });
/// assert_eq!(evens.try_move_next(Some(3)).unwrap(), Advance::Continue);
/// assert_eq!(evens.try_move_next(Some(4)).unwrap(), Advance::Done(Some(4)));
/// ```
pub fn advance_fn<T, U, F>(f: F) -> AdvanceFn<F>
where
    F: FnMut(Option<T>) -> anyhow::Result<Advance<U>>,
{
    AdvanceFn(f)
}

/// Pull session over `S` whose elements are chosen by the hook `M`.
pub struct Sequential<S, M>
where
    S: AsyncSource,
    M: MoveNext<S::Item>,
{
    inner: Rc<Inner<S, M>>,
}

struct Inner<S, M>
where
    S: AsyncSource,
    M: MoveNext<S::Item>,
{
    session: Session<S, M::Output>,
    hook: RefCell<M>,
}

impl<S, M> Sequential<S, M>
where
    S: AsyncSource + 'static,
    M: MoveNext<S::Item> + 'static,
{
    /// The upstream is not touched until the first `get_next`.
    pub fn new(source: S, hook: M, cancel: CancellationToken) -> Self {
        Self {
            inner: Rc::new(Inner {
                session: Session::new(source, cancel),
                hook: RefCell::new(hook),
            }),
        }
    }

    /// Status of the pull most recently started.
    pub fn status(&self) -> SlotStatus {
        self.inner.session.slot().status()
    }
}

impl<S, M> Inner<S, M>
where
    S: AsyncSource + 'static,
    M: MoveNext<S::Item> + 'static,
{
    /// Trampoline over synchronously completed upstream steps.
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

            match this.advance(next.result()) {
                Ok(Advance::Continue) => continue,
                Ok(Advance::Done(outcome)) => return this.session.resolve(outcome, true),
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
        match this.advance(next.result()) {
            Ok(Advance::Continue) => Self::pull_upstream(&this),
            Ok(Advance::Done(outcome)) => this.session.resolve(outcome, true),
            Err(err) => this.session.fault(err),
        }
    }

    fn advance(&self, has_next: Result<bool, PullError>) -> Result<Advance<M::Output>, PullError> {
        let item = if has_next? {
            self.session.upstream_current()
        } else {
            None
        };
        Ok(self.hook.borrow_mut().try_move_next(item)?)
    }
}

impl<S, M> CompletionSource<bool> for Inner<S, M>
where
    S: AsyncSource,
    M: MoveNext<S::Item>,
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

impl<S, M> AsyncPull for Sequential<S, M>
where
    S: AsyncSource + 'static,
    M: MoveNext<S::Item> + 'static,
{
    type Item = M::Output;

    fn get_next(&self) -> SlotFuture<bool> {
        let generation = match self.inner.session.begin() {
            Ok(generation) => generation,
            Err(err) => return SlotFuture::failed(err),
        };
        Inner::pull_upstream(&self.inner);
        let source: Rc<dyn CompletionSource<bool>> = self.inner.clone();
        SlotFuture::new(source, generation)
    }

    fn current(&self) -> Option<M::Output> {
        self.inner.session.current()
    }

    fn dispose(&self) -> SlotFuture<()> {
        self.inner.session.dispose()
    }
}

/// Source producing a fresh [`Sequential`] per enumeration.
///
/// Lets a sequential iterator serve as the upstream of another iterator.
pub struct SequentialSource<S, F> {
    source: S,
    hook: F,
}

/// Build a [`SequentialSource`] over `source`, calling `hook` for every new
/// enumeration.
pub fn sequential<S, F, M>(source: S, hook: F) -> SequentialSource<S, F>
where
    S: AsyncSource + Clone + 'static,
    F: Fn() -> M,
    M: MoveNext<S::Item> + 'static,
{
    SequentialSource { source, hook }
}

impl<S, F, M> AsyncSource for SequentialSource<S, F>
where
    S: AsyncSource + Clone + 'static,
    F: Fn() -> M,
    M: MoveNext<S::Item> + 'static,
{
    type Item = M::Output;
    type Pull = Sequential<S, M>;

    fn pull(&self, cancel: CancellationToken) -> Self::Pull {
        Sequential::new(self.source.clone(), (self.hook)(), cancel)
    }
}

impl<S: Clone, F: Clone> Clone for SequentialSource<S, F> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            hook: self.hook.clone(),
        }
    }
}
