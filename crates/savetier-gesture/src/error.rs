//! Error types for the gesture classifier.

use thiserror::Error;

/// Errors surfaced by [`crate::GestureClassifier`].
#[derive(Debug, Error)]
pub enum GestureError {
    /// A press arrived while another session was still pending.
    #[error("gesture session already armed")]
    SessionActive {
        /// Identifier of the pending session.
        session_id: u64,
    },
    /// The classifier was built outside a tokio runtime.
    #[error("deadline timer requires a tokio runtime")]
    RuntimeUnavailable {
        /// Underlying runtime lookup error.
        source: tokio::runtime::TryCurrentError,
    },
}

/// Result alias for gesture operations.
pub type GestureResult<T> = Result<T, GestureError>;
