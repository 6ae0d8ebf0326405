//! Error types for user upload storage operations

use aws_sdk_dynamodb::error::{BuildError, SdkError};
use aws_sdk_dynamodb::operation::{
    batch_write_item::BatchWriteItemError, put_item::PutItemError, query::QueryError,
};
use thiserror::Error;

/// Result type alias for storage operations
pub type UserUploadStorageResult<T> = Result<T, UserUploadStorageError>;

/// Storage error types for user upload operations
#[derive(Debug, Error)]
pub enum UserUploadStorageError {
    /// Failed to insert upload record into `DynamoDB`
    #[error("Failed to insert upload record into DynamoDB: {0:?}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to query upload records from `DynamoDB`
    #[error("Failed to query upload records from DynamoDB: {0:?}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Failed to batch delete upload records from `DynamoDB`
    #[error("Failed to batch delete upload records from DynamoDB: {0:?}")]
    DynamoDbBatchWriteError(#[from] SdkError<BatchWriteItemError>),

    /// Failed to build a `DynamoDB` request
    #[error("Failed to build DynamoDB request: {0}")]
    RequestBuildError(#[from] BuildError),

    /// `DynamoDB` accepted the batch but left some deletes unprocessed
    #[error("{0} upload records were left unprocessed by the batch delete")]
    UnprocessedDeletes(usize),

    /// Failed to convert between an upload record and a `DynamoDB` item
    #[error("Failed to parse upload record: {0}")]
    SerializationError(String),

    /// The record store could not be reached
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_dynamo::Error> for UserUploadStorageError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
