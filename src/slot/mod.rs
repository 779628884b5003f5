//! Reusable, generation-checked single-shot completion.
//!
//! A [`CompletionSlot`] is allocated once per iterator and reset at the start
//! of every pull. Each reset advances the slot's [`Generation`]; a
//! [`SlotFuture`] remembers the generation it was created for, so results and
//! continuations from an earlier use of the slot can never leak into a later
//! one.

mod completion;
mod continuation;
mod future;
mod promise;

pub use completion::{Completion, CompletionSlot, SlotStatus};
pub use continuation::{Callback, Continuation};
pub use future::{CompletionSource, SlotFuture};
pub use promise::Promise;

/// Counter distinguishing successive uses of one completion slot.
///
/// Wraps on overflow; a session would need four billion pulls while holding
/// on to a stale future for a wrapped generation to collide.
pub type Generation = u32;
