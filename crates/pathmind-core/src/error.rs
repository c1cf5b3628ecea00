//! Error types.
//!
//! `BackendError` represents failures when talking to the assessment backend.
//! It lives in `pathmind-core` so the session controller and the offline
//! fallback can downcast and classify errors without string matching.
//! `SessionError` covers transitions the session state machine refuses.

use thiserror::Error;

use crate::session::SessionState;

/// Errors that can occur when interacting with the assessment backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Authentication failed (missing or rejected token).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The backend answered with a body we could not decode, or with no data.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The backend does not speak any API version this client supports.
    #[error("no supported API version (backend offers {offered:?}, client supports {supported:?})")]
    UnsupportedVersion {
        offered: Vec<String>,
        supported: Vec<String>,
    },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// Failure injected by a test backend.
    #[error("simulated failure: {0}")]
    Simulated(String),
}

impl BackendError {
    /// Returns `true` if retrying the same call cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            BackendError::AuthenticationFailed(_)
                | BackendError::NotFound(_)
                | BackendError::UnsupportedVersion { .. }
        )
    }
}

/// Transitions the test session refuses to perform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session is {0}, expected active")]
    NotActive(SessionState),

    #[error("questions have already been loaded")]
    AlreadyLoaded,

    #[error("a submission is already in flight")]
    SubmissionInProgress,

    #[error("test has already been submitted")]
    AlreadySubmitted,

    #[error("option '{option}' does not belong to question '{question}'")]
    UnknownOption { question: String, option: String },

    #[error("the test can only be submitted from the last question ({current}/{total})")]
    NotOnLastQuestion { current: usize, total: usize },

    #[error("session task has stopped")]
    Closed,
}
