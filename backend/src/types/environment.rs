//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use tracing::Level;

/// Default lifetime of a minted upload URL: 15 minutes
const DEFAULT_UPLOAD_URL_EXPIRY_SECS: u64 = 15 * 60;
/// Default lifetime of a gallery serving URL: 1 hour
const DEFAULT_SERVING_URL_EXPIRY_SECS: u64 = 60 * 60;
/// Default retention window: 5 minutes
const DEFAULT_RETENTION_SECS: u64 = 5 * 60;
/// Default request body limit: 15 MiB
const DEFAULT_MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development {
        /// Optional override for serving URL expiry in seconds
        presign_expiry_override: Option<u64>,
    },
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|val| val.trim().parse::<u64>().ok())
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development {
                presign_expiry_override: env_u64("PRESIGNED_URL_EXPIRY_SECS"),
            },
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the S3 bucket name holding uploaded images
    ///
    /// # Panics
    ///
    /// Panics if the `S3_BUCKET_NAME` environment variable is not set outside development
    #[must_use]
    pub fn s3_bucket(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("S3_BUCKET_NAME").expect("S3_BUCKET_NAME environment variable is not set")
            }
            Self::Development { .. } => {
                env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "kitten-uploads".to_string())
            }
        }
    }

    /// Returns the `DynamoDB` table holding upload records
    ///
    /// # Panics
    ///
    /// Panics if the `UPLOADS_TABLE_NAME` environment variable is not set outside development
    #[must_use]
    pub fn uploads_table_name(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("UPLOADS_TABLE_NAME")
                .expect("UPLOADS_TABLE_NAME environment variable is not set"),
            Self::Development { .. } => {
                env::var("UPLOADS_TABLE_NAME").unwrap_or_else(|_| "kitten-uploads".to_string())
            }
        }
    }

    /// Returns the name of the (`kind`, `upload_time`) index on the uploads table
    #[must_use]
    pub fn uploads_time_index_name(&self) -> String {
        env::var("UPLOADS_TIME_INDEX_NAME").unwrap_or_else(|_| "upload-time-index".to_string())
    }

    /// Secret used to sign upload tickets
    ///
    /// # Panics
    ///
    /// Panics if `UPLOAD_SIGNING_SECRET` is not set outside development
    #[must_use]
    pub fn upload_signing_secret(&self) -> Vec<u8> {
        match self {
            Self::Production | Self::Staging => env::var("UPLOAD_SIGNING_SECRET")
                .expect("UPLOAD_SIGNING_SECRET environment variable is not set")
                .into_bytes(),
            Self::Development { .. } => env::var("UPLOAD_SIGNING_SECRET")
                .unwrap_or_else(|_| "kittens-development-secret".to_string())
                .into_bytes(),
        }
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development { .. } => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development { .. }) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// Lifetime of a minted upload URL in seconds
    #[must_use]
    pub fn upload_url_expiry_secs(&self) -> u64 {
        env_u64("UPLOAD_URL_EXPIRY_SECS").unwrap_or(DEFAULT_UPLOAD_URL_EXPIRY_SECS)
    }

    /// Lifetime of the presigned URLs handed out by the gallery, in seconds
    #[must_use]
    pub fn serving_url_expiry_secs(&self) -> u64 {
        let configured = env_u64("SERVING_URL_EXPIRY_SECS");
        match self {
            Self::Production | Self::Staging => {
                configured.unwrap_or(DEFAULT_SERVING_URL_EXPIRY_SECS)
            }
            Self::Development {
                presign_expiry_override,
            } => presign_expiry_override
                .or(configured)
                .unwrap_or(DEFAULT_SERVING_URL_EXPIRY_SECS),
        }
    }

    /// Age after which uploads are removed by the retention sweep
    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::from_secs(env_u64("RETENTION_SECS").unwrap_or(DEFAULT_RETENTION_SECS))
    }

    /// Interval of the in-process retention sweep, if enabled
    #[must_use]
    pub fn prune_interval(&self) -> Option<Duration> {
        env_u64("PRUNE_INTERVAL_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Maximum accepted request body size in bytes
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Time budget of a single request
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            env_u64("REQUEST_TIMEOUT_SECS").unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Default log level when `RUST_LOG` is not set
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development { .. } => Level::DEBUG,
            })
    }
}
