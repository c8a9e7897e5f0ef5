use crate::status::Code;

/// Errors produced by the adaptive throttling middleware stack.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ThrottleError {
    /// The call was shed locally without contacting the backend.
    ///
    /// When the `axum` feature is enabled, this converts to `503 Service Unavailable`.
    #[error("client request throttled")]
    Throttled,

    /// The inner service did not respond within the managed deadline.
    ///
    /// When the `axum` feature is enabled, this converts to `408 Request Timeout`.
    #[error("Request timed out waiting for the inner service")]
    Timeout,

    /// An unexpected error occurred in the inner service.
    ///
    /// The string contains the `Display` representation of the inner error.
    /// When the `axum` feature is enabled, this converts to `500 Internal Server Error`.
    #[error("Internal service error: {0}")]
    Inner(String),
}

impl ThrottleError {
    /// The status code reported to the application for this error.
    pub fn code(&self) -> Code {
        match self {
            Self::Throttled => Code::ResourceExhausted,
            Self::Timeout => Code::DeadlineExceeded,
            Self::Inner(_) => Code::Unknown,
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ThrottleError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match self {
            Self::Throttled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Inner(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
