//! Browser upload flow on top of the object store
//!
//! The landing page embeds an upload URL carrying a signed ticket. When the form is
//! posted back, `parse_upload` checks the ticket, writes every attached file to the
//! object store and hands back the stored references together with the plain form
//! fields, keyed by field name.

mod ticket;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{multipart::MultipartError, Multipart};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

pub use ticket::{TicketError, TicketSigner, UploadTicket};

use crate::media_storage::{BucketError, ObjectStore};

/// Prefix of every object written through the upload flow
const KEY_PREFIX: &str = "kittens";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors raised while accepting an upload
#[derive(Debug, Error)]
pub enum UploadError {
    /// The ticket in the upload URL was rejected
    #[error(transparent)]
    Ticket(#[from] TicketError),

    /// The multipart body could not be read
    #[error("Failed to read multipart body: {0}")]
    Multipart(#[from] MultipartError),

    /// An attached file could not be stored
    #[error(transparent)]
    Storage(#[from] BucketError),
}

/// A file stored from an upload form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Object store key the file was written to
    pub blob_key: String,
    /// File name reported by the browser
    pub file_name: String,
    /// Content type reported by the browser
    pub content_type: String,
    /// Size in bytes
    pub size: usize,
}

/// Result of parsing an upload form
#[derive(Debug, Default)]
pub struct ParsedUpload {
    /// Stored files by form field name
    pub files: HashMap<String, Vec<FileInfo>>,
    /// Text values by form field name
    pub fields: HashMap<String, Vec<String>>,
}

impl ParsedUpload {
    /// First file posted under `field`
    #[must_use]
    pub fn first_file(&self, field: &str) -> Option<&FileInfo> {
        self.files.get(field).and_then(|files| files.first())
    }

    /// First text value posted under `field`
    #[must_use]
    pub fn first_value(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Mints upload URLs and ingests the forms posted to them
pub struct Blobstore {
    objects: Arc<dyn ObjectStore>,
    signer: TicketSigner,
}

impl Blobstore {
    /// Creates a blobstore writing to `objects`
    #[must_use]
    pub fn new(objects: Arc<dyn ObjectStore>, signer: TicketSigner) -> Self {
        Self { objects, signer }
    }

    /// Mints a single-use upload URL whose form submission is delivered to `target`
    ///
    /// # Errors
    ///
    /// Returns `BucketError::ConfigError` if `target` is not an absolute path without a query,
    /// or if the configured ticket lifetime cannot be applied to `now`
    pub fn upload_url(&self, target: &str, now: DateTime<Utc>) -> Result<String, BucketError> {
        if !target.starts_with('/') || target.contains(['?', '#']) {
            return Err(BucketError::ConfigError(format!(
                "Invalid upload target: {target}"
            )));
        }

        let ticket = self
            .signer
            .mint(target, now)
            .map_err(|e| BucketError::ConfigError(format!("Failed to mint upload ticket: {e}")))?;
        debug!(nonce = %ticket.nonce, expires_at = %ticket.expires_at, "Minted upload URL");

        Ok(format!("{target}?ticket={}", ticket.token))
    }

    /// Verifies the ticket and stores every non-empty file of the multipart body
    ///
    /// Files are written under `kittens/{nonce}/{index}`. Because object writes are
    /// conditional, replaying a ticket collides with the objects of its first use.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Ticket` for a rejected ticket, `UploadError::Multipart` for
    /// an unreadable body and `UploadError::Storage` if a file cannot be stored
    pub async fn parse_upload(
        &self,
        target: &str,
        ticket: &str,
        now: DateTime<Utc>,
        mut multipart: Multipart,
    ) -> Result<ParsedUpload, UploadError> {
        let nonce = self.signer.verify(target, ticket, now)?;
        let mut parsed = ParsedUpload::default();
        let mut index = 0_usize;

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(ToString::to_string) else {
                continue;
            };

            let Some(file_name) = field.file_name().map(ToString::to_string) else {
                let value = field.text().await?;
                parsed.fields.entry(name).or_default().push(value);
                continue;
            };

            let content_type = field
                .content_type()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string();
            let data = field.bytes().await?;

            // Browsers send an empty part when no file was picked
            if data.is_empty() {
                continue;
            }

            let blob_key = format!("{KEY_PREFIX}/{nonce}/{index}");
            index += 1;
            let size = data.len();

            self.objects.put_object(&blob_key, &content_type, data).await?;

            parsed.files.entry(name).or_default().push(FileInfo {
                blob_key,
                file_name,
                content_type,
                size,
            });
        }

        Ok(parsed)
    }
}
