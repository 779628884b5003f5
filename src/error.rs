//! Errors observed through completion slots and pull sessions.

use std::sync::Arc;

use thiserror::Error;

use crate::slot::Generation;

/// Shared handle to the error stored in a faulted slot.
///
/// The same fault is handed to every reader of the slot and forwarded
/// downstream unchanged, so it is reference counted rather than cloned.
pub type Fault = Arc<anyhow::Error>;

/// Failure outcome of a single-shot future or a misuse of a pull session.
#[derive(Debug, Clone, Error)]
pub enum PullError {
    /// An upstream source, transform or decision hook failed.
    #[error("pull faulted: {0:#}")]
    Faulted(Fault),

    /// The cancellation signal was observed when the result was produced.
    #[error("pull canceled")]
    Canceled,

    /// The generation does not belong to the slot's current use.
    #[error("invalid generation {requested}; current generation {current}")]
    InvalidGeneration {
        requested: Generation,
        current: Generation,
    },

    /// The result was requested before the slot completed.
    #[error("generation {0} has not completed yet")]
    NotYetCompleted(Generation),

    /// A second callback continuation was registered for the same generation.
    #[error("a continuation is already registered for generation {0}")]
    ContinuationAlreadyRegistered(Generation),

    /// `get_next` was called while the previous pull was still running.
    #[error("a pull is already in flight on this session")]
    PullInFlight,

    /// The session was disposed.
    #[error("pull session disposed")]
    Disposed,

    /// An earlier pull on this session faulted or was canceled.
    #[error("pull session terminated by an earlier fault or cancellation")]
    Terminated,
}

impl PullError {
    /// Fault for a pull that reported an element but exposes no current value.
    pub(crate) fn missing_current() -> Self {
        Self::faulted(anyhow::anyhow!(
            "pull reported an element without a current value"
        ))
    }

    /// Wrap an arbitrary error as a fault.
    pub fn faulted(err: impl Into<anyhow::Error>) -> Self {
        Self::Faulted(Arc::new(err.into()))
    }

    /// Returns `true` for [`PullError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns the underlying error of a [`PullError::Faulted`].
    pub fn fault(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Faulted(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Errors raised by hooks come back as `anyhow::Error`; a `PullError` that was
/// propagated through `?` keeps its identity instead of being wrapped twice.
impl From<anyhow::Error> for PullError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<PullError>() {
            Ok(pull) => pull,
            Err(err) => Self::Faulted(Arc::new(err)),
        }
    }
}
