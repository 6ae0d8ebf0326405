use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use datadog_tracing::axum::shutdown_signal;
use kittens::{
    media_storage::MediaStorage,
    retention, server,
    state::{AppSettings, AppState},
    types::Environment,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{fmt, EnvFilter};
use upload_storage::user_upload::UserUploadStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(environment.tracing_level()).into())
        .from_env_lossy();

    // Use JSON format for staging/production (Datadog), regular format for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt().json().with_env_filter(filter).init();
        }
        Environment::Development { .. } => {
            fmt().with_env_filter(filter).init();
        }
    }

    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let media_storage = Arc::new(MediaStorage::new(
        s3_client,
        environment.s3_bucket(),
        environment.serving_url_expiry_secs(),
    ));

    let dynamodb_client = Arc::new(DynamoDbClient::new(&environment.aws_config().await));
    let upload_storage = Arc::new(UserUploadStorage::new(
        dynamodb_client,
        environment.uploads_table_name(),
        environment.uploads_time_index_name(),
    ));

    info!("✅ Initialized storage clients");

    let state = AppState::new(
        upload_storage,
        media_storage.clone(),
        media_storage,
        AppSettings::from_environment(&environment),
    );

    // Single shutdown token for everything
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down Kittens...");
        signal_token.cancel();
    });

    let scheduled_sweep = environment.prune_interval().map(|interval| {
        retention::spawn_scheduled(
            state.pruner.clone(),
            interval,
            environment.request_timeout(),
            shutdown.clone(),
        )
    });

    server::start(environment, state, shutdown).await?;

    if let Some(handle) = scheduled_sweep {
        handle.await?;
    }

    Ok(())
}
