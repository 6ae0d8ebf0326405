use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::user_upload::{
    NewUserUpload, UploadRecordStore, UserUpload, UserUploadStorageError, UserUploadStorageResult,
};

/// Record store kept in process memory, with switches to simulate outages
#[derive(Default)]
pub struct InMemoryUploadStore {
    uploads: Mutex<Vec<UserUpload>>,
    fail_inserts: AtomicBool,
    fail_queries: AtomicBool,
    fail_deletes: AtomicBool,
    delete_calls: AtomicUsize,
}

impl InMemoryUploadStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record as-is, bypassing id generation
    pub async fn seed(&self, upload: UserUpload) {
        self.uploads.lock().await.push(upload);
    }

    /// Snapshot of every stored record in insertion order
    pub async fn all(&self) -> Vec<UserUpload> {
        self.uploads.lock().await.clone()
    }

    /// Makes subsequent inserts fail
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent queries fail
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent batch deletes fail
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of `delete_many` calls received
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool, operation: &str) -> UserUploadStorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(UserUploadStorageError::Unavailable(format!(
                "{operation} failed"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UploadRecordStore for InMemoryUploadStore {
    async fn insert(&self, upload: NewUserUpload) -> UserUploadStorageResult<UserUpload> {
        Self::check(&self.fail_inserts, "insert")?;

        let upload = UserUpload {
            id: uuid::Uuid::new_v4().to_string(),
            name: upload.name,
            blob_key: upload.blob_key,
            upload_time: upload.upload_time,
        };
        self.uploads.lock().await.push(upload.clone());

        Ok(upload)
    }

    async fn list_recent(&self) -> UserUploadStorageResult<Vec<UserUpload>> {
        Self::check(&self.fail_queries, "query")?;

        let mut uploads = self.uploads.lock().await.clone();
        uploads.sort_by_key(|upload| std::cmp::Reverse(upload.upload_time));
        Ok(uploads)
    }

    async fn list_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> UserUploadStorageResult<Vec<UserUpload>> {
        Self::check(&self.fail_queries, "query")?;

        let mut uploads: Vec<_> = self
            .uploads
            .lock()
            .await
            .iter()
            .filter(|upload| upload.upload_time < cutoff)
            .cloned()
            .collect();
        uploads.sort_by_key(|upload| upload.upload_time);
        Ok(uploads)
    }

    async fn delete_many(&self, ids: &[String]) -> UserUploadStorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_deletes, "batch delete")?;

        self.uploads
            .lock()
            .await
            .retain(|upload| !ids.contains(&upload.id));
        Ok(())
    }
}
