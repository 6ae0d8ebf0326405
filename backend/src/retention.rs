//! Retention sweep: removes uploads older than the retention window

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use upload_storage::user_upload::UploadRecordStore;

use crate::media_storage::ImageService;
use crate::types::{RequestContext, UpstreamError};

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Records older than the cutoff
    pub matched: usize,
    /// Serving URLs released
    pub released: usize,
    /// Serving URLs that could not be released
    pub release_failures: usize,
    /// Records deleted
    pub deleted: usize,
}

/// Deletes upload records older than `retention` and releases their serving URLs
pub struct RetentionPruner {
    records: Arc<dyn UploadRecordStore>,
    images: Arc<dyn ImageService>,
    retention: Duration,
}

impl RetentionPruner {
    /// Creates a pruner
    #[must_use]
    pub fn new(
        records: Arc<dyn UploadRecordStore>,
        images: Arc<dyn ImageService>,
        retention: Duration,
    ) -> Self {
        Self {
            records,
            images,
            retention,
        }
    }

    /// Oldest upload time that survives a sweep run at `now`
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Runs one sweep.
    ///
    /// Release failures are logged and counted; every matched record is deleted
    /// regardless, in a single batch.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` if the query or the batch delete fails. A failed query
    /// deletes nothing.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<PruneReport, UpstreamError> {
        let cutoff = self.cutoff(now);

        let expired = ctx
            .within(self.records.list_older_than(cutoff))
            .await
            .inspect_err(|err| error!(%err, %cutoff, "Failed to query expired uploads"))?;

        let mut report = PruneReport {
            matched: expired.len(),
            ..PruneReport::default()
        };
        if expired.is_empty() {
            return Ok(report);
        }

        for upload in &expired {
            match ctx
                .within(self.images.release_serving_url(&upload.blob_key))
                .await
            {
                Ok(()) => report.released += 1,
                Err(err) => {
                    warn!(blob_key = %upload.blob_key, %err, "Failed to release serving URL");
                    report.release_failures += 1;
                }
            }
        }

        let ids: Vec<String> = expired.into_iter().map(|upload| upload.id).collect();
        ctx.within(self.records.delete_many(&ids))
            .await
            .inspect_err(|err| error!(%err, count = ids.len(), "Failed to delete expired uploads"))?;
        report.deleted = ids.len();

        info!(
            matched = report.matched,
            released = report.released,
            release_failures = report.release_failures,
            deleted = report.deleted,
            %cutoff,
            "Retention sweep finished"
        );

        Ok(report)
    }
}

/// Runs the pruner every `interval` until `shutdown` is cancelled
pub fn spawn_scheduled(
    pruner: Arc<RetentionPruner>,
    interval: Duration,
    timeout: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "Scheduled retention sweep started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Scheduled retention sweep stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let ctx = RequestContext::new(
                        format!("scheduled-prune-{}", uuid::Uuid::new_v4()),
                        timeout,
                    );
                    if let Err(e) = pruner.run(&ctx, Utc::now()).await {
                        error!(request_id = %ctx.request_id, "Scheduled retention sweep failed: {e}");
                    }
                }
            }
        }
    })
}
