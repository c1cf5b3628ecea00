//! Backend error classification.
//!
//! The error type itself lives in `pathmind-core` so the session and the
//! offline fallback can inspect it; this module maps HTTP outcomes onto it.

use reqwest::StatusCode;

pub use pathmind_core::error::BackendError;

/// Map a non-success HTTP status to a `BackendError`.
///
/// `what` names the resource for `NotFound` (e.g. "test 7").
pub fn from_status(status: StatusCode, body: String, what: &str) -> BackendError {
    match status.as_u16() {
        401 | 403 => BackendError::AuthenticationFailed(if body.is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            body
        }),
        404 => BackendError::NotFound(what.to_string()),
        code => BackendError::ApiError {
            status: code,
            message: body,
        },
    }
}

/// Map a transport failure to a `BackendError`.
pub fn from_transport(err: reqwest::Error, base_url: &str, timeout_secs: u64) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(timeout_secs)
    } else if err.is_connect() {
        BackendError::NetworkError(format!("backend not reachable at {base_url}"))
    } else {
        BackendError::NetworkError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            from_status(StatusCode::UNAUTHORIZED, String::new(), "tests"),
            BackendError::AuthenticationFailed(m) if m == "HTTP 401"
        ));
        assert!(matches!(
            from_status(StatusCode::FORBIDDEN, "token expired".into(), "tests"),
            BackendError::AuthenticationFailed(m) if m == "token expired"
        ));
        assert!(matches!(
            from_status(StatusCode::NOT_FOUND, String::new(), "test 9"),
            BackendError::NotFound(m) if m == "test 9"
        ));
        assert!(matches!(
            from_status(StatusCode::SERVICE_UNAVAILABLE, "down".into(), "tests"),
            BackendError::ApiError { status: 503, .. }
        ));
    }
}
