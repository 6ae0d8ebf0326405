//! Record storage for kitten uploads
//!
//! This crate owns the upload metadata schema and the `DynamoDB` access used by the
//! web backend: inserting records, listing them most-recent-first, selecting the ones
//! past the retention window and deleting them in batches.

pub mod user_upload;

/// In-memory record store used by handler tests
#[cfg(feature = "test-utils")]
pub mod memory;
