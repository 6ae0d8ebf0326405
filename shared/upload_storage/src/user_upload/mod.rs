//! User upload storage module for `DynamoDB` operations
//!
//! Every record lives in a single table keyed by `id`. Ordering and retention queries go
//! through a global secondary index whose hash key is the constant record type
//! (`kind`) and whose range key is `upload_time`, so a single query returns every
//! upload sorted by time.

mod error;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, WriteRequest};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_dynamo::{from_items, to_item};
use strum::Display;
use tracing::debug;

pub use error::{UserUploadStorageError, UserUploadStorageResult};

/// Value of the `kind` attribute shared by every upload record
pub const USER_UPLOAD_KIND: &str = "UserUpload";

/// Maximum number of write requests accepted by a single `BatchWriteItem` call
const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// A persisted kitten upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpload {
    /// Primary key - unique record ID (UUID v4)
    pub id: String,
    /// Caption supplied by the uploader
    pub name: String,
    /// Object store key of the uploaded image
    pub blob_key: String,
    /// Server time at which the record was created
    pub upload_time: DateTime<Utc>,
}

/// Request to create a new upload record
#[derive(Debug, Clone)]
pub struct NewUserUpload {
    /// Caption supplied by the uploader
    pub name: String,
    /// Object store key of the uploaded image
    pub blob_key: String,
    /// Server time at ingestion
    pub upload_time: DateTime<Utc>,
}

/// `DynamoDB` attribute names for the user upload table
#[derive(Debug, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UserUploadAttribute {
    /// Primary key - unique record ID
    Id,
    /// Record type, hash key of the time index
    Kind,
    /// Caption
    Name,
    /// Object store key
    BlobKey,
    /// Upload timestamp in Unix milliseconds, range key of the time index
    UploadTime,
}

/// Item layout as stored in `DynamoDB`
#[derive(Debug, Serialize, Deserialize)]
struct UserUploadItem {
    id: String,
    kind: String,
    name: String,
    blob_key: String,
    upload_time: i64,
}

impl From<&UserUpload> for UserUploadItem {
    fn from(upload: &UserUpload) -> Self {
        Self {
            id: upload.id.clone(),
            kind: USER_UPLOAD_KIND.to_string(),
            name: upload.name.clone(),
            blob_key: upload.blob_key.clone(),
            upload_time: upload.upload_time.timestamp_millis(),
        }
    }
}

impl TryFrom<UserUploadItem> for UserUpload {
    type Error = UserUploadStorageError;

    fn try_from(item: UserUploadItem) -> Result<Self, Self::Error> {
        let upload_time = DateTime::<Utc>::from_timestamp_millis(item.upload_time).ok_or_else(
            || {
                UserUploadStorageError::SerializationError(format!(
                    "upload_time out of range: {}",
                    item.upload_time
                ))
            },
        )?;

        Ok(Self {
            id: item.id,
            name: item.name,
            blob_key: item.blob_key,
            upload_time,
        })
    }
}

/// Record store operations needed by the web backend
#[async_trait]
pub trait UploadRecordStore: Send + Sync {
    /// Persists a new record under a freshly generated key
    async fn insert(&self, upload: NewUserUpload) -> UserUploadStorageResult<UserUpload>;

    /// Returns every record ordered by `upload_time`, most recent first
    async fn list_recent(&self) -> UserUploadStorageResult<Vec<UserUpload>>;

    /// Returns every record whose `upload_time` is strictly before `cutoff`
    async fn list_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> UserUploadStorageResult<Vec<UserUpload>>;

    /// Deletes the records with the given ids
    async fn delete_many(&self, ids: &[String]) -> UserUploadStorageResult<()>;
}

/// Storage client for user upload records
pub struct UserUploadStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
    time_index_name: String,
}

impl UserUploadStorage {
    /// Creates a new storage instance
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured `DynamoDB` client
    /// * `table_name` - `DynamoDB` table name for upload records
    /// * `time_index_name` - Name of the GSI keyed by (`kind`, `upload_time`)
    #[must_use]
    pub const fn new(
        dynamodb_client: Arc<DynamoDbClient>,
        table_name: String,
        time_index_name: String,
    ) -> Self {
        Self {
            dynamodb_client,
            table_name,
            time_index_name,
        }
    }

    fn parse_items(
        items: Vec<std::collections::HashMap<String, AttributeValue>>,
    ) -> UserUploadStorageResult<Vec<UserUpload>> {
        from_items::<_, UserUploadItem>(items)?
            .into_iter()
            .map(UserUpload::try_from)
            .collect()
    }
}

#[async_trait]
impl UploadRecordStore for UserUploadStorage {
    /// # Errors
    ///
    /// Returns `UserUploadStorageError` if the `DynamoDB` put operation fails
    async fn insert(&self, upload: NewUserUpload) -> UserUploadStorageResult<UserUpload> {
        let upload = UserUpload {
            id: uuid::Uuid::new_v4().to_string(),
            name: upload.name,
            blob_key: upload.blob_key,
            upload_time: upload.upload_time,
        };

        let item = to_item(UserUploadItem::from(&upload))?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#id)")
            .expression_attribute_names("#id", UserUploadAttribute::Id.to_string())
            .send()
            .await?;

        debug!(id = %upload.id, "Inserted upload record");

        Ok(upload)
    }

    async fn list_recent(&self) -> UserUploadStorageResult<Vec<UserUpload>> {
        let items = self
            .dynamodb_client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.time_index_name)
            .key_condition_expression("#kind = :kind")
            .expression_attribute_names("#kind", UserUploadAttribute::Kind.to_string())
            .expression_attribute_values(":kind", AttributeValue::S(USER_UPLOAD_KIND.to_string()))
            .scan_index_forward(false)
            .into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await?;

        Self::parse_items(items)
    }

    async fn list_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> UserUploadStorageResult<Vec<UserUpload>> {
        let items = self
            .dynamodb_client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.time_index_name)
            .key_condition_expression("#kind = :kind AND #upload_time < :cutoff")
            .expression_attribute_names("#kind", UserUploadAttribute::Kind.to_string())
            .expression_attribute_names(
                "#upload_time",
                UserUploadAttribute::UploadTime.to_string(),
            )
            .expression_attribute_values(":kind", AttributeValue::S(USER_UPLOAD_KIND.to_string()))
            .expression_attribute_values(
                ":cutoff",
                AttributeValue::N(cutoff.timestamp_millis().to_string()),
            )
            .into_paginator()
            .items()
            .send()
            .collect::<Result<Vec<_>, _>>()
            .await?;

        Self::parse_items(items)
    }

    /// Deletes in chunks of 25, the `BatchWriteItem` limit. Unprocessed items are
    /// reported, not retried.
    async fn delete_many(&self, ids: &[String]) -> UserUploadStorageResult<()> {
        let mut unprocessed = 0;

        for chunk in ids.chunks(MAX_BATCH_WRITE_ITEMS) {
            let requests = chunk
                .iter()
                .map(|id| {
                    DeleteRequest::builder()
                        .key(
                            UserUploadAttribute::Id.to_string(),
                            AttributeValue::S(id.clone()),
                        )
                        .build()
                        .map(|delete| WriteRequest::builder().delete_request(delete).build())
                })
                .collect::<Result<Vec<_>, _>>()?;

            let response = self
                .dynamodb_client
                .batch_write_item()
                .request_items(&self.table_name, requests)
                .send()
                .await?;

            unprocessed += response
                .unprocessed_items()
                .and_then(|items| items.get(&self.table_name))
                .map_or(0, Vec::len);
        }

        if unprocessed > 0 {
            return Err(UserUploadStorageError::UnprocessedDeletes(unprocessed));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn upload() -> UserUpload {
        UserUpload {
            id: "test-id".to_string(),
            name: "Whiskers".to_string(),
            blob_key: "kittens/abc/0".to_string(),
            upload_time: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
        }
    }

    #[test]
    fn test_item_carries_kind_and_millis() {
        let item = UserUploadItem::from(&upload());
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["kind"], USER_UPLOAD_KIND);
        assert_eq!(json["upload_time"], 1_700_000_000_123_i64);
        assert_eq!(json["blob_key"], "kittens/abc/0");
    }

    #[test]
    fn test_item_converts_back_to_upload() {
        let original = upload();
        let restored = UserUpload::try_from(UserUploadItem::from(&original)).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn test_out_of_range_timestamp_is_rejected() {
        let item = UserUploadItem {
            id: "test-id".to_string(),
            kind: USER_UPLOAD_KIND.to_string(),
            name: "Whiskers".to_string(),
            blob_key: "kittens/abc/0".to_string(),
            upload_time: i64::MAX,
        };

        assert!(matches!(
            UserUpload::try_from(item),
            Err(UserUploadStorageError::SerializationError(_))
        ));
    }

    #[test]
    fn test_attribute_names_are_snake_case() {
        assert_eq!(UserUploadAttribute::BlobKey.to_string(), "blob_key");
        assert_eq!(UserUploadAttribute::UploadTime.to_string(), "upload_time");
    }
}
