//! The pull contract shared by sources and iterators.
//!
//! Every iterator in this crate both consumes an [`AsyncPull`] and is one, so
//! iterators stack: the output of one can be the upstream of another.

use tokio_util::sync::CancellationToken;

use crate::slot::SlotFuture;

/// One live enumeration: pull elements one at a time, then dispose.
///
/// At most one `get_next` may be outstanding at a time.
pub trait AsyncPull {
    type Item: Clone;

    /// Advance to the next element. Resolves to `true` when [`current`]
    /// holds a new element and `false` once the sequence is exhausted.
    ///
    /// [`current`]: AsyncPull::current
    fn get_next(&self) -> SlotFuture<bool>;

    /// Element produced by the last successful `get_next`.
    fn current(&self) -> Option<Self::Item>;

    /// Release the enumeration. Safe to call more than once.
    fn dispose(&self) -> SlotFuture<()>;
}

/// Something that can be enumerated, possibly many times.
pub trait AsyncSource {
    type Item: Clone;
    type Pull: AsyncPull<Item = Self::Item>;

    /// Start a new enumeration observing `cancel`.
    fn pull(&self, cancel: CancellationToken) -> Self::Pull;
}
