//! Object storage integration for training archives
//!
//! Issues time-bounded pre-signed PUT URLs so clients upload their zip of
//! training images directly to the bucket; the backend never touches the
//! archive bytes itself.

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;
use uuid::Uuid;

/// A pre-signed upload slot handed to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Pre-signed PUT URL, valid until expiry
    pub url: String,

    /// Object key the archive will land under
    pub key: String,
}

/// Build the object key for a fresh archive upload
pub fn archive_key(prefix: &str) -> String {
    format!("{}/{}.zip", prefix.trim_end_matches('/'), Uuid::new_v4())
}

/// Issues pre-signed upload URLs against the configured bucket
#[derive(Clone)]
pub struct UploadUrlIssuer {
    client: S3Client,
    bucket: String,
    prefix: String,
    expiry: Duration,
}

impl UploadUrlIssuer {
    /// Create a new issuer from storage configuration
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(ref region) = config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(ref endpoint) = config.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self::with_client(S3Client::from_conf(s3_config), config))
    }

    /// Create with an existing S3 client
    pub fn with_client(client: S3Client, config: &StorageConfig) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            prefix: config.upload_prefix.clone(),
            expiry: config.upload_expiry(),
        }
    }

    /// Issue a pre-signed PUT URL and object key for a training archive
    pub async fn issue_upload_url(&self) -> Result<UploadTarget> {
        let key = archive_key(&self.prefix);

        let presigning = PresigningConfig::expires_in(self.expiry).map_err(|e| {
            AppError::Storage {
                message: format!("Invalid pre-sign expiry: {}", e),
            }
        })?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/zip")
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Storage {
                message: format!("Failed to pre-sign upload URL: {}", e),
            })?;

        tracing::debug!(key = %key, "Issued pre-signed upload URL");

        Ok(UploadTarget {
            url: presigned.uri().to_string(),
            key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_key_shape() {
        let key = archive_key("models");
        assert!(key.starts_with("models/"));
        assert!(key.ends_with(".zip"));

        let stem = key
            .strip_prefix("models/")
            .and_then(|k| k.strip_suffix(".zip"))
            .unwrap();
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_archive_key_trims_prefix_slash() {
        let key = archive_key("models/");
        assert!(!key.contains("//"));
    }

    #[test]
    fn test_archive_keys_unique() {
        assert_ne!(archive_key("models"), archive_key("models"));
    }
}
