//! Explicit per-request context handed to every handler

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use axum::{extract::FromRequestParts, http::request::Parts};
use thiserror::Error;
use tokio::time::Instant;

use crate::state::AppState;

/// Header carrying a caller-supplied request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Failure of a call to an external service made on behalf of a request
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request ran out of time before the call completed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The service returned an error
    #[error(transparent)]
    Service(Box<dyn std::error::Error + Send + Sync>),
}

/// Request-scoped data: an id for log correlation and a deadline for upstream calls
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Id recorded on every log line of the request
    pub request_id: String,
    /// Point in time after which upstream calls are abandoned
    pub deadline: Instant,
}

impl RequestContext {
    /// Creates a context whose deadline is `timeout` from now
    #[must_use]
    pub fn new(request_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: Instant::now() + timeout,
        }
    }

    /// Runs an upstream call bounded by the request deadline
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::DeadlineExceeded` if the deadline passes first, or
    /// `UpstreamError::Service` wrapping the call's own error
    pub async fn within<T, E>(
        &self,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, UpstreamError>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        tokio::time::timeout_at(self.deadline, call)
            .await
            .map_err(|_| UpstreamError::DeadlineExceeded)?
            .map_err(|e| UpstreamError::Service(Box::new(e)))
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), ToString::to_string);

        Ok(Self::new(request_id, state.request_timeout))
    }
}
