mod gallery;
mod health;
mod index;
mod prune;
mod upload;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Path the upload form is posted to
pub const UPLOAD_PATH: &str = "/upload";
/// Path of the gallery page
pub const GALLERY_PATH: &str = "/gallery";

/// Creates the router with all handler routes
pub fn handler() -> Router<AppState> {
    Router::new()
        .route("/", get(index::handler))
        .route(UPLOAD_PATH, post(upload::handler))
        .route(GALLERY_PATH, get(gallery::handler))
        .route("/prune", get(prune::handler))
        .route("/health", get(health::handler))
}

/// 302 Found redirect
pub(crate) fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
