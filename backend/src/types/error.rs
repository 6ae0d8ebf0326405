//! Universal error handling for the web handlers

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::UpstreamError;

/// Application error carrying the response status and a machine-readable code.
///
/// The code only reaches the logs. Clients always get the bare status text, so
/// different internal failures are indistinguishable from the outside.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(status: StatusCode, code: &'static str) -> Self {
        Self { status, code }
    }

    /// 500 Internal Server Error
    #[must_use]
    pub const fn internal(code: &'static str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code)
    }

    /// Response status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.status.as_u16() {
            400..=499 => tracing::warn!("Client error: {}", self.code),
            500..=599 => tracing::error!("Server error: {}", self.code),
            _ => {}
        }

        let body = self.status.canonical_reason().unwrap_or("Error");
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::DeadlineExceeded => Self::internal("deadline_exceeded"),
            UpstreamError::Service(_) => Self::internal("upstream_error"),
        }
    }
}
