//! Sources whose every step completes synchronously.
//!
//! ```rust
//! use pullcore::{AsyncPull, AsyncSource, from_iter};
//! use tokio_util::sync::CancellationToken;
//!
//! let source = from_iter([1, 2]);
//! let pull = source.pull(CancellationToken::new());
//! assert!(pull.get_next().result().unwrap());
//! assert_eq!(pull.current(), Some(1));
//! ```

use std::cell::{Cell, RefCell};

use tokio_util::sync::CancellationToken;

use crate::error::PullError;
use crate::pull::{AsyncPull, AsyncSource};
use crate::slot::SlotFuture;

/// Source enumerating a cloneable iterator. Created by [`from_iter`].
#[derive(Clone, Debug)]
pub struct IterSource<I> {
    iter: I,
}

/// Turn anything iterable into a source. Each enumeration starts from a clone
/// of the iterator it was built from.
pub fn from_iter<T>(iter: T) -> IterSource<T::IntoIter>
where
    T: IntoIterator,
    T::IntoIter: Clone,
    T::Item: Clone,
{
    IterSource {
        iter: iter.into_iter(),
    }
}

impl<I> AsyncSource for IterSource<I>
where
    I: Iterator + Clone,
    I::Item: Clone,
{
    type Item = I::Item;
    type Pull = IterPull<I>;

    /// Every step is ready immediately, so the signal is never consulted.
    fn pull(&self, _cancel: CancellationToken) -> IterPull<I> {
        IterPull {
            iter: RefCell::new(self.iter.clone()),
            current: RefCell::new(None),
            disposed: Cell::new(false),
        }
    }
}

/// One enumeration of an [`IterSource`].
pub struct IterPull<I: Iterator> {
    iter: RefCell<I>,
    current: RefCell<Option<I::Item>>,
    disposed: Cell<bool>,
}

impl<I> AsyncPull for IterPull<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = I::Item;

    fn get_next(&self) -> SlotFuture<bool> {
        if self.disposed.get() {
            return SlotFuture::failed(PullError::Disposed);
        }
        let next = self.iter.borrow_mut().next();
        let has_next = next.is_some();
        *self.current.borrow_mut() = next;
        SlotFuture::ready(has_next)
    }

    fn current(&self) -> Option<I::Item> {
        self.current.borrow().clone()
    }

    fn dispose(&self) -> SlotFuture<()> {
        self.disposed.set(true);
        self.current.borrow_mut().take();
        SlotFuture::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerations_are_independent() {
        let source = from_iter(vec!['x', 'y']);
        let first = source.pull(CancellationToken::new());
        assert!(first.get_next().result().unwrap());
        assert!(first.get_next().result().unwrap());
        assert_eq!(first.current(), Some('y'));
        assert!(!first.get_next().result().unwrap());
        assert_eq!(first.current(), None);

        let second = source.pull(CancellationToken::new());
        assert!(second.get_next().result().unwrap());
        assert_eq!(second.current(), Some('x'));
    }

    #[test]
    fn test_pulling_after_dispose_fails() {
        let pull = from_iter(0..3).pull(CancellationToken::new());
        assert!(pull.get_next().result().unwrap());
        assert!(pull.dispose().result().is_ok());
        assert!(matches!(pull.get_next().result(), Err(PullError::Disposed)));
        assert_eq!(pull.current(), None);
    }
}
