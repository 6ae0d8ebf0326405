//! S3-based image storage and serving
//!
//! Uploaded images are written once under a fresh key and are never overwritten.
//! Browsers fetch them straight from the bucket through presigned `GET` URLs, so the
//! application never proxies image bytes.

mod error;
#[cfg(feature = "test-utils")]
mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{
    error::SdkError, presigning::PresigningConfig, primitives::ByteStream, Client as S3Client,
};
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

pub use error::{BucketError, BucketResult};
#[cfg(feature = "test-utils")]
pub use memory::InMemoryMediaStorage;

/// Presigned URL with expiration information
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL for GET operations
    pub url: String,
    /// UTC timestamp when the URL expires
    pub expires_at: DateTime<Utc>,
}

/// Binary object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `key`. Fails with `BucketError::ObjectExists` if the key is taken.
    async fn put_object(&self, key: &str, content_type: &str, body: Bytes) -> BucketResult<()>;
}

/// Image serving: derives direct, time-limited URLs for stored images
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Resolves a URL a browser can load the image from
    async fn serving_url(&self, key: &str) -> BucketResult<PresignedUrl>;

    /// Releases everything derived from `key` for serving
    async fn release_serving_url(&self, key: &str) -> BucketResult<()>;
}

/// Image storage client for S3 operations
pub struct MediaStorage {
    s3_client: Arc<S3Client>,
    bucket_name: String,
    presigned_url_expiry_secs: u64,
}

impl MediaStorage {
    /// Creates a new media storage client
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - S3 bucket name for image storage
    /// * `presigned_url_expiry_secs` - Lifetime of the serving URLs in seconds
    #[must_use]
    pub const fn new(
        s3_client: Arc<S3Client>,
        bucket_name: String,
        presigned_url_expiry_secs: u64,
    ) -> Self {
        Self {
            s3_client,
            bucket_name,
            presigned_url_expiry_secs,
        }
    }
}

#[async_trait]
impl ObjectStore for MediaStorage {
    /// Uses a conditional write (`If-None-Match: *`) so a key can only be written once.
    ///
    /// # Errors
    ///
    /// Returns `BucketError::ObjectExists` if the key already holds an object,
    /// `BucketError::UpstreamError` for 5xx errors and `BucketError::S3Error` otherwise
    async fn put_object(&self, key: &str, content_type: &str, body: Bytes) -> BucketResult<()> {
        let content_length = body.len();

        let result = self
            .s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .if_none_match("*")
            .body(ByteStream::from(body))
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(key, content_length, "Stored object");
                Ok(())
            }
            // 412 Precondition Failed, or 409 when a concurrent write holds the key
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.raw().status().as_u16(), 409 | 412) =>
            {
                Err(BucketError::ObjectExists(key.to_string()))
            }
            Err(e) => Err(BucketError::from(e)),
        }
    }
}

#[async_trait]
impl ImageService for MediaStorage {
    /// # Errors
    ///
    /// Returns `BucketError::ConfigError` if presigning config creation fails
    /// Returns `BucketError::S3Error` if presigned URL generation fails
    async fn serving_url(&self, key: &str) -> BucketResult<PresignedUrl> {
        let presigned_config =
            PresigningConfig::expires_in(Duration::from_secs(self.presigned_url_expiry_secs))
                .map_err(|e| {
                    BucketError::ConfigError(format!("Failed to create presigning config: {e}"))
                })?;

        let presigned_url = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigned_config)
            .await?;

        let expires_at: DateTime<Utc> =
            Utc::now() + Duration::from_secs(self.presigned_url_expiry_secs);

        Ok(PresignedUrl {
            url: presigned_url.uri().to_string(),
            expires_at,
        })
    }

    /// Presigned URLs carry no server-side state, so releasing them means removing the
    /// object they point at. Deleting a missing key succeeds.
    async fn release_serving_url(&self, key: &str) -> BucketResult<()> {
        self.s3_client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await?;

        debug!(key, "Released serving URL");
        Ok(())
    }
}
