use axum::{extract::State, response::Html};
use chrono::Utc;
use tracing::{error, instrument};

use super::UPLOAD_PATH;
use crate::{
    state::AppState,
    templates,
    types::{AppError, RequestContext},
};

/// Landing page: mints an upload URL and renders the form pointing at it
#[instrument(skip_all, fields(request_id = %ctx.request_id))]
pub async fn handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let upload_url = state
        .blobstore
        .upload_url(UPLOAD_PATH, Utc::now())
        .map_err(|err| {
            error!(%err, "Failed to mint upload URL");
            AppError::internal("upload_url_failed")
        })?;

    Ok(templates::index(&upload_url))
}
