use axum::{extract::State, Json};
use chrono::Utc;
use tracing::instrument;

use crate::{
    retention::PruneReport,
    state::AppState,
    types::{AppError, RequestContext},
};

/// Maintenance trigger running one retention sweep
#[instrument(skip_all, fields(request_id = %ctx.request_id))]
pub async fn handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<PruneReport>, AppError> {
    let report = state.pruner.run(&ctx, Utc::now()).await?;
    Ok(Json(report))
}
