use axum::{extract::State, response::Html};
use tracing::{debug, error, instrument};

use crate::{
    gallery::{group_into_rows, resolve_display_items},
    state::AppState,
    templates,
    types::RequestContext,
};

/// Gallery page, most recent uploads first, three per row.
///
/// A failed record query renders an empty gallery instead of an error.
#[instrument(skip_all, fields(request_id = %ctx.request_id))]
pub async fn handler(ctx: RequestContext, State(state): State<AppState>) -> Html<String> {
    let uploads = ctx
        .within(state.records.list_recent())
        .await
        .unwrap_or_else(|err| {
            error!(%err, "Failed to fetch uploads");
            Vec::new()
        });

    let items = resolve_display_items(&ctx, state.images.as_ref(), uploads).await;
    let rows = group_into_rows(items);
    debug!(rows = rows.len(), "Rendering gallery");

    templates::gallery(&rows)
}
