//! # Pullcore: Allocation-Free Async Pull Iteration
//!
//! Pull values one at a time from an asynchronous source, optionally passing
//! each one through a second asynchronous operation, on a single-threaded
//! cooperative scheduler.
//!
//! ## Core Pieces
//!
//! - **[`CompletionSlot`](slot::CompletionSlot)**: reusable single-shot result
//!   holder, versioned by a generation so it can be reset for every pull
//! - **[`Sequential`]**: pulls from an upstream and lets a [`MoveNext`] hook
//!   accept, skip, or end on each element
//! - **[`Fused`]**: like [`Sequential`] with an asynchronous [`Transform`] per
//!   element
//!
//! Both iterators consume an [`AsyncPull`] and are one, so they stack. Steps
//! that complete synchronously are consumed by a loop, never by recursion,
//! and a pull that never suspends performs no heap allocation.
//!
//! ## Example
//!
//! ```
//! use pullcore::*;
//! use tokio_util::sync::CancellationToken;
//!
//! let evens = Sequential::new(
//!     from_iter(1..=6),
//!     advance_fn(|item: Option<i32>| {
//!         Ok(match item {
//!             Some(v) if v % 2 == 0 => Advance::Done(Some(v)),
//!             Some(_) => Advance::Continue,
//!             None => Advance::Done(None),
//!         })
//!     }),
//!     CancellationToken::new(),
//! );
//!
//! let items = futures::executor::block_on(collect(&evens)).unwrap();
//! assert_eq!(items, vec![2, 4, 6]);
//! ```
//!
//! ## Common Functions
//!
//! **Building Iterators:**
//! - [`from_iter(iter)`] - Source whose steps always complete synchronously
//! - [`advance_fn(f)`] - Sequential hook from a closure
//! - [`transform_fn(transform, accept)`] - Fused hooks from two closures
//! - [`sequential(source, hook)`] / [`fused(source, hook)`] - Iterators as sources
//!
//! **Execution:**
//! - [`for_each(pull, f)`] / [`collect(pull)`] - Drive to exhaustion, then dispose
//! - [`into_stream()`](AsyncPullExt::into_stream) - Consume as a `futures::Stream`

mod error;
mod fused;
mod handler;
mod pull;
mod sequential;
mod session;
pub mod slot;
mod source;
mod step;
mod stream;

#[cfg(test)]
mod testing;

pub use error::*;
pub use fused::*;
pub use handler::*;
pub use pull::*;
pub use sequential::*;
pub use source::*;
pub use step::*;
pub use stream::*;
