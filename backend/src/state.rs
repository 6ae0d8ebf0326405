//! Application state management

use std::sync::Arc;
use std::time::Duration;

use upload_storage::user_upload::UploadRecordStore;

use crate::blobstore::{Blobstore, TicketSigner};
use crate::media_storage::{ImageService, ObjectStore};
use crate::retention::RetentionPruner;
use crate::types::Environment;

/// Tunables resolved once at start-up
#[derive(Clone)]
pub struct AppSettings {
    /// Secret signing upload tickets
    pub upload_signing_secret: Vec<u8>,
    /// Lifetime of minted upload URLs in seconds
    pub upload_url_expiry_secs: u64,
    /// Age after which uploads are pruned
    pub retention: Duration,
    /// Time budget of a single request
    pub request_timeout: Duration,
}

impl AppSettings {
    /// Reads the settings for `environment`
    #[must_use]
    pub fn from_environment(environment: &Environment) -> Self {
        Self {
            upload_signing_secret: environment.upload_signing_secret(),
            upload_url_expiry_secs: environment.upload_url_expiry_secs(),
            retention: environment.retention(),
            request_timeout: environment.request_timeout(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Upload URL minting and form ingestion
    pub blobstore: Arc<Blobstore>,
    /// Upload metadata
    pub records: Arc<dyn UploadRecordStore>,
    /// Serving URL resolution
    pub images: Arc<dyn ImageService>,
    /// Retention sweep
    pub pruner: Arc<RetentionPruner>,
    /// Time budget of a single request
    pub request_timeout: Duration,
}

impl AppState {
    /// Wires the handlers' collaborators together
    #[must_use]
    pub fn new(
        records: Arc<dyn UploadRecordStore>,
        objects: Arc<dyn ObjectStore>,
        images: Arc<dyn ImageService>,
        settings: AppSettings,
    ) -> Self {
        let signer = TicketSigner::new(
            settings.upload_signing_secret,
            settings.upload_url_expiry_secs,
        );
        let pruner = RetentionPruner::new(records.clone(), images.clone(), settings.retention);

        Self {
            blobstore: Arc::new(Blobstore::new(objects, signer)),
            records,
            images,
            pruner: Arc::new(pruner),
            request_timeout: settings.request_timeout,
        }
    }
}
