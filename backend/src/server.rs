use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    Router,
};
use datadog_tracing::axum::{OtelAxumLayer, OtelInResponseLayer};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;

use crate::{
    routes,
    state::AppState,
    types::{AppError, Environment},
};

/// Starts the server with the given environment and state
///
/// Serves until `shutdown` is cancelled, then drains in-flight requests.
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let router = with_request_limits(
        routes::handler().with_state(state),
        environment.max_upload_bytes(),
        environment.request_timeout(),
    )
    // Include trace context as header into the response
    .layer(OtelInResponseLayer)
    // Start OpenTelemetry trace on incoming request
    .layer(OtelAxumLayer::default());

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8080), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🐱 Kittens started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(anyhow::Error::from)
}

/// Applies the body size limit and the request timeout to `router`
///
/// A request running past `request_timeout` is answered with the same
/// `500 Internal Server Error` body as any other server failure.
pub fn with_request_limits(
    router: Router,
    max_upload_bytes: usize,
    request_timeout: Duration,
) -> Router {
    router
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            request_timeout,
        ))
        .layer(map_response(render_bare_server_errors))
}

/// Server errors produced by middleware carry no body; render them like `AppError`
async fn render_bare_server_errors(response: Response) -> Response {
    if response.status().is_server_error() && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        return AppError::new(response.status(), "request_timeout").into_response();
    }
    response
}
