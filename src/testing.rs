//! Hand-driven sources shared by the unit tests.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tokio_util::sync::CancellationToken;

use crate::error::PullError;
use crate::pull::{AsyncPull, AsyncSource};
use crate::slot::{Continuation, Generation, Promise, SlotFuture};

/// Pull every element of a pullable whose steps complete synchronously.
pub(crate) fn drain_ready<P: AsyncPull>(pull: &P) -> Result<Vec<P::Item>, PullError> {
    let mut items = Vec::new();
    while pull.get_next().result()? {
        items.extend(pull.current());
    }
    Ok(items)
}

/// Counts how often the futures it watches complete.
#[derive(Clone, Default)]
pub(crate) struct ResolutionCounter(Rc<Cell<usize>>);

impl ResolutionCounter {
    /// Register a callback continuation on `future`.
    pub(crate) fn watch<T>(&self, future: &SlotFuture<T>) {
        future
            .on_completed(Continuation::new(Self::fired, &self.0))
            .unwrap();
    }

    pub(crate) fn count(&self) -> usize {
        self.0.get()
    }

    fn fired(state: Rc<dyn Any>, _generation: Generation) {
        if let Ok(count) = state.downcast::<Cell<usize>>() {
            count.set(count.get() + 1);
        }
    }
}

/// Late-bound handle letting a hook dispose the iterator that owns it.
#[derive(Clone, Default)]
pub(crate) struct DisposeHandle(Rc<RefCell<Option<Box<dyn Fn()>>>>);

impl DisposeHandle {
    pub(crate) fn bind<P: AsyncPull + 'static>(&self, pull: &Rc<P>) {
        let pull = Rc::downgrade(pull);
        *self.0.borrow_mut() = Some(Box::new(move || {
            if let Some(pull) = pull.upgrade() {
                let _ = pull.dispose();
            }
        }));
    }

    pub(crate) fn dispose(&self) {
        if let Some(dispose) = self.0.borrow().as_ref() {
            dispose();
        }
    }
}

/// Pull that always claims an element but never exposes one.
#[derive(Default)]
pub(crate) struct HollowPull {
    disposed: Cell<usize>,
}

impl HollowPull {
    pub(crate) fn disposed(&self) -> usize {
        self.disposed.get()
    }
}

impl AsyncPull for HollowPull {
    type Item = u32;

    fn get_next(&self) -> SlotFuture<bool> {
        SlotFuture::ready(true)
    }

    fn current(&self) -> Option<u32> {
        None
    }

    fn dispose(&self) -> SlotFuture<()> {
        self.disposed.set(self.disposed.get() + 1);
        SlotFuture::ready(())
    }
}

/// Source whose steps stay pending until the test completes them.
///
/// Every clone and every enumeration share the same element cursor.
pub(crate) struct ManualSource<T> {
    shared: Rc<Manual<T>>,
}

struct Manual<T> {
    items: Vec<T>,
    cursor: Cell<usize>,
    promise: Promise<bool>,
    pending: Cell<bool>,
    current: RefCell<Option<T>>,
    disposed: Cell<usize>,
}

impl<T> Clone for ManualSource<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: Clone + 'static> ManualSource<T> {
    pub(crate) fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            shared: Rc::new(Manual {
                items: items.into_iter().collect(),
                cursor: Cell::new(0),
                promise: Promise::new(),
                pending: Cell::new(false),
                current: RefCell::new(None),
                disposed: Cell::new(0),
            }),
        }
    }

    /// Complete the outstanding step with the next element, or with
    /// exhaustion once the elements run out.
    pub(crate) fn complete_next(&self) {
        let shared = &self.shared;
        if !shared.pending.replace(false) {
            return;
        }
        let cursor = shared.cursor.get();
        let next = shared.items.get(cursor).cloned();
        if next.is_some() {
            shared.cursor.set(cursor + 1);
        }
        let has_next = next.is_some();
        *shared.current.borrow_mut() = next;
        shared.promise.try_set_result(has_next);
    }

    /// Fail the outstanding step.
    pub(crate) fn fail_next(&self, err: anyhow::Error) {
        if self.shared.pending.replace(false) {
            self.shared.promise.try_set_exception(err);
        }
    }

    pub(crate) fn disposed(&self) -> usize {
        self.shared.disposed.get()
    }
}

impl<T: Clone + 'static> AsyncSource for ManualSource<T> {
    type Item = T;
    type Pull = ManualPull<T>;

    fn pull(&self, _cancel: CancellationToken) -> ManualPull<T> {
        ManualPull {
            shared: Rc::clone(&self.shared),
        }
    }
}

pub(crate) struct ManualPull<T> {
    shared: Rc<Manual<T>>,
}

impl<T: Clone + 'static> AsyncPull for ManualPull<T> {
    type Item = T;

    fn get_next(&self) -> SlotFuture<bool> {
        self.shared.promise.reset();
        self.shared.pending.set(true);
        self.shared.promise.future()
    }

    fn current(&self) -> Option<T> {
        self.shared.current.borrow().clone()
    }

    fn dispose(&self) -> SlotFuture<()> {
        self.shared.disposed.set(self.shared.disposed.get() + 1);
        SlotFuture::ready(())
    }
}

/// Wraps a source and counts enumerations started and disposed.
pub(crate) struct CountingSource<S> {
    source: S,
    counters: Rc<Counters>,
}

#[derive(Default)]
struct Counters {
    started: Cell<usize>,
    disposed: Cell<usize>,
}

impl<S: Clone> Clone for CountingSource<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            counters: Rc::clone(&self.counters),
        }
    }
}

impl<S> CountingSource<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            counters: Rc::default(),
        }
    }

    pub(crate) fn started(&self) -> usize {
        self.counters.started.get()
    }

    pub(crate) fn disposed(&self) -> usize {
        self.counters.disposed.get()
    }
}

impl<S: AsyncSource> AsyncSource for CountingSource<S> {
    type Item = S::Item;
    type Pull = CountingPull<S::Pull>;

    fn pull(&self, cancel: CancellationToken) -> Self::Pull {
        self.counters.started.set(self.counters.started.get() + 1);
        CountingPull {
            pull: self.source.pull(cancel),
            counters: Rc::clone(&self.counters),
        }
    }
}

pub(crate) struct CountingPull<P> {
    pull: P,
    counters: Rc<Counters>,
}

impl<P: AsyncPull> AsyncPull for CountingPull<P> {
    type Item = P::Item;

    fn get_next(&self) -> SlotFuture<bool> {
        self.pull.get_next()
    }

    fn current(&self) -> Option<P::Item> {
        self.pull.current()
    }

    fn dispose(&self) -> SlotFuture<()> {
        self.counters.disposed.set(self.counters.disposed.get() + 1);
        self.pull.dispose()
    }
}
