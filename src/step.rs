//! Decision results returned by iterator hooks.
//!
//! A pull is driven by a loop that asks a hook what to do with each upstream
//! element. [`Advance`] is the two-way answer used by sequential iterators,
//! [`Step`] is the three-way answer used when a per-element transform may
//! itself have to wait.

/// Decision returned by a sequential iterator hook for one upstream element.
///
/// # Examples
///
/// ```rust
/// use pullcore::Advance;
///
/// let skip: Advance<i32> = Advance::Continue;
/// let emit = Advance::Done(Some(7));
/// let end: Advance<i32> = Advance::Done(None);
///
/// assert!(!skip.is_done());
/// assert!(emit.is_done());
/// assert_eq!(end.done_value(), Some(None));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Advance<T> {
    /// Discard this element and pull the next one from upstream.
    Continue,
    /// Finish the pull. `Some` becomes the new current element, `None`
    /// reports that the sequence is exhausted.
    Done(Option<T>),
}

impl<T> Advance<T> {
    /// Returns `true` if the pull should finish.
    #[inline]
    pub const fn is_done(&self) -> bool {
        matches!(self, Advance::Done(_))
    }

    /// Converts into the outcome of a finished pull, or `None` for `Continue`.
    ///
    /// ```rust
    /// use pullcore::Advance;
    ///
    /// assert_eq!(Advance::Done(Some(1)).done_value(), Some(Some(1)));
    /// assert_eq!(Advance::<i32>::Continue.done_value(), None);
    /// ```
    #[inline]
    pub fn done_value(self) -> Option<Option<T>> {
        match self {
            Advance::Continue => None,
            Advance::Done(outcome) => Some(outcome),
        }
    }

    /// Maps the element carried by `Done(Some(_))`.
    ///
    /// ```rust
    /// use pullcore::Advance;
    ///
    /// assert_eq!(Advance::Done(Some(2)).map(|v| v * 10), Advance::Done(Some(20)));
    /// assert_eq!(Advance::<i32>::Done(None).map(|v| v * 10), Advance::Done(None));
    /// assert_eq!(Advance::<i32>::Continue.map(|v| v * 10), Advance::Continue);
    /// ```
    #[inline]
    pub fn map<U, F>(self, f: F) -> Advance<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Advance::Continue => Advance::Continue,
            Advance::Done(outcome) => Advance::Done(outcome.map(f)),
        }
    }
}

/// Tri-state decision for one element of a fused transform iterator.
///
/// # Examples
///
/// ```rust
/// use pullcore::{Advance, Step};
///
/// let waiting: Step<i32> = Step::Wait;
/// assert!(waiting.is_wait());
///
/// let retry: Step<i32> = Advance::Continue.into();
/// assert!(retry.is_retry());
///
/// let done: Step<i32> = Advance::Done(Some(3)).into();
/// assert_eq!(done, Step::Done(Some(3)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step<T> {
    /// The transform is still running; a continuation has been registered
    /// and control must return to the caller.
    Wait,
    /// The transform rejected the element; pull the next one.
    Retry,
    /// Finish the pull with this outcome.
    Done(Option<T>),
}

impl<T> Step<T> {
    /// Returns `true` if the step is `Wait`.
    #[inline]
    pub const fn is_wait(&self) -> bool {
        matches!(self, Step::Wait)
    }

    /// Returns `true` if the step is `Retry`.
    #[inline]
    pub const fn is_retry(&self) -> bool {
        matches!(self, Step::Retry)
    }

    /// Returns `true` if the step is `Done`.
    #[inline]
    pub const fn is_done(&self) -> bool {
        matches!(self, Step::Done(_))
    }
}

impl<T> From<Advance<T>> for Step<T> {
    fn from(advance: Advance<T>) -> Self {
        match advance {
            Advance::Continue => Step::Retry,
            Advance::Done(outcome) => Step::Done(outcome),
        }
    }
}
