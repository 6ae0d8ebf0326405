//! Kittens: photo sharing backed by S3 and `DynamoDB`

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

/// Upload URL minting and multipart ingestion
pub mod blobstore;

/// Gallery assembly
pub mod gallery;

/// S3 object storage and image serving
pub mod media_storage;

/// Retention sweep
pub mod retention;

/// HTTP routes
pub mod routes;

/// HTTP server
pub mod server;

/// Application state
pub mod state;

/// HTML pages
pub mod templates;

/// Shared types: configuration, errors, request context
pub mod types;
