use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{BucketError, BucketResult, ImageService, ObjectStore, PresignedUrl};

/// Object store and image service kept in process memory
#[derive(Default)]
pub struct InMemoryMediaStorage {
    objects: Mutex<HashMap<String, (String, Bytes)>>,
    released: Mutex<Vec<String>>,
    unresolvable: Mutex<HashSet<String>>,
    unreleasable: Mutex<HashSet<String>>,
    fail_puts: AtomicBool,
}

impl InMemoryMediaStorage {
    /// Creates an empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type and bytes stored under `key`
    pub async fn object(&self, key: &str) -> Option<(String, Bytes)> {
        self.objects.lock().await.get(key).cloned()
    }

    /// Number of stored objects
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Keys whose serving URLs were released, in call order
    pub async fn released(&self) -> Vec<String> {
        self.released.lock().await.clone()
    }

    /// Makes serving URL resolution fail for `key`
    pub async fn fail_serving_url_for(&self, key: &str) {
        self.unresolvable.lock().await.insert(key.to_string());
    }

    /// Makes serving URL release fail for `key`
    pub async fn fail_release_for(&self, key: &str) {
        self.unreleasable.lock().await.insert(key.to_string());
    }

    /// Makes subsequent object writes fail
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for InMemoryMediaStorage {
    async fn put_object(&self, key: &str, content_type: &str, body: Bytes) -> BucketResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(BucketError::UpstreamError("put failed".to_string()));
        }

        let mut objects = self.objects.lock().await;
        if objects.contains_key(key) {
            return Err(BucketError::ObjectExists(key.to_string()));
        }
        objects.insert(key.to_string(), (content_type.to_string(), body));
        Ok(())
    }
}

#[async_trait]
impl ImageService for InMemoryMediaStorage {
    async fn serving_url(&self, key: &str) -> BucketResult<PresignedUrl> {
        if self.unresolvable.lock().await.contains(key) {
            return Err(BucketError::S3Error(format!("cannot presign {key}")));
        }

        Ok(PresignedUrl {
            url: format!("https://images.test/{key}"),
            expires_at: Utc::now() + Duration::from_secs(3600),
        })
    }

    async fn release_serving_url(&self, key: &str) -> BucketResult<()> {
        if self.unreleasable.lock().await.contains(key) {
            return Err(BucketError::UpstreamError(format!("cannot release {key}")));
        }

        self.objects.lock().await.remove(key);
        self.released.lock().await.push(key.to_string());
        Ok(())
    }
}
