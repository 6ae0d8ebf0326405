use axum::{
    extract::{Multipart, Query, State},
    response::Response,
};
use chrono::{SubsecRound, Utc};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use upload_storage::user_upload::NewUserUpload;
use validator::Validate;

use super::{found, GALLERY_PATH, UPLOAD_PATH};
use crate::{
    blobstore::UploadError,
    state::AppState,
    types::{AppError, RequestContext},
};

/// Form field carrying the image
const FILE_FIELD: &str = "file";
/// Form field carrying the caption
const NAME_FIELD: &str = "kitten_name";

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Ticket minted with the upload URL
    pub ticket: Option<String>,
}

#[derive(Debug, Validate)]
struct KittenForm {
    #[validate(length(min = 1, message = "missing_kitten_name"))]
    kitten_name: String,
}

/// Receives the upload form, records the upload and redirects to the gallery.
///
/// Missing input sends the browser back to the form. A file stored before the
/// name check fails stays in the bucket without a record.
#[instrument(skip_all, fields(request_id = %ctx.request_id))]
pub async fn handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let Some(ticket) = query.ticket else {
        warn!("Upload posted without a ticket");
        return Ok(found("/"));
    };

    let parsed = match state
        .blobstore
        .parse_upload(UPLOAD_PATH, &ticket, Utc::now(), multipart)
        .await
    {
        Ok(parsed) => parsed,
        Err(UploadError::Ticket(err)) => {
            warn!(%err, "Rejected upload ticket");
            return Ok(found("/"));
        }
        Err(err) => {
            error!(%err, "Failed to parse upload");
            return Err(AppError::internal("upload_parse_failed"));
        }
    };

    let Some(file) = parsed.first_file(FILE_FIELD) else {
        warn!("No file uploaded");
        return Ok(found("/"));
    };

    let form = KittenForm {
        kitten_name: parsed.first_value(NAME_FIELD).unwrap_or_default().to_string(),
    };
    if let Err(err) = form.validate() {
        warn!(blob_key = %file.blob_key, %err, "No kitten name specified");
        return Ok(found("/"));
    }

    let upload = ctx
        .within(state.records.insert(NewUserUpload {
            name: form.kitten_name,
            blob_key: file.blob_key.clone(),
            // Records are indexed in whole milliseconds
            upload_time: Utc::now().trunc_subsecs(3),
        }))
        .await
        .map_err(|err| {
            error!(%err, blob_key = %file.blob_key, "Failed to store upload record");
            AppError::internal("record_write_failed")
        })?;

    info!(id = %upload.id, blob_key = %upload.blob_key, "Stored upload");

    Ok(found(GALLERY_PATH))
}
