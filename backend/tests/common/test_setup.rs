use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use chrono::Utc;
use kittens::{
    media_storage::InMemoryMediaStorage,
    routes,
    state::{AppSettings, AppState},
};
use tower::ServiceExt;
use upload_storage::memory::InMemoryUploadStore;

use super::utils::{multipart_body, Part, BOUNDARY};

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    // Load test environment variables
    dotenvy::from_path(".env.example").ok();

    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Settings used by `TestSetup::new`
pub fn test_settings() -> AppSettings {
    AppSettings {
        upload_signing_secret: b"test-signing-secret".to_vec(),
        upload_url_expiry_secs: 60,
        retention: Duration::from_secs(300),
        request_timeout: Duration::from_secs(5),
    }
}

/// Router wired to in-memory stores
pub struct TestSetup {
    pub router: Router,
    pub state: AppState,
    pub records: Arc<InMemoryUploadStore>,
    pub media: Arc<InMemoryMediaStorage>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_retention(Duration::from_secs(300))
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self::with_settings(AppSettings {
            retention,
            ..test_settings()
        })
    }

    pub fn with_settings(settings: AppSettings) -> Self {
        setup_test_env();

        let records = Arc::new(InMemoryUploadStore::new());
        let media = Arc::new(InMemoryMediaStorage::new());

        let state = AppState::new(records.clone(), media.clone(), media.clone(), settings);

        let router = routes::handler().with_state(state.clone());

        Self {
            router,
            state,
            records,
            media,
        }
    }

    /// A freshly minted upload URL, as the landing page would embed it
    pub fn upload_url(&self) -> String {
        self.state
            .blobstore
            .upload_url(routes::UPLOAD_PATH, Utc::now())
            .expect("Failed to mint upload URL")
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_multipart_request(
        &self,
        route: &str,
        parts: &[Part],
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    /// Posts a kitten through a fresh upload URL
    pub async fn upload_kitten(&self, name: &str, image: &[u8]) -> Response {
        self.send_multipart_request(
            &self.upload_url(),
            &[
                Part::file("file", "kitten.jpg", "image/jpeg", image),
                Part::text("kitten_name", name),
            ],
        )
        .await
        .expect("Failed to send request")
    }
}
