//! # Object Storage
//!
//! Complaint images live in a Google Cloud Storage bucket.
//!
//! - Uploads go through the JSON API media endpoint, one request per image
//! - Objects are addressed as `<public-base>/<bucket>/<key>`
//! - No retries, no timeout, no cleanup of objects left behind by failed submissions
//!
//! `STORAGE_API_URL` and `STORAGE_PUBLIC_URL` can point at an emulator.
use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{Client, header::CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("bucket name is not configured")]
    MissingBucket,

    #[error("upload rejected: {0}")]
    Status(String),

    #[error("upload failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` under `key` and returns the public URL of the object.
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, StorageError>;
}

pub struct GcsBucket {
    client: Client,
    api_url: String,
    public_url: String,
    bucket: Option<String>,
    token: Option<String>,
}

impl GcsBucket {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.storage_api_url.clone(),
            public_url: config.storage_public_url.clone(),
            bucket: config.bucket_name.clone(),
            token: config.storage_token.clone(),
        }
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{bucket}/{key}", self.public_url)
    }
}

#[async_trait]
impl ObjectStore for GcsBucket {
    #[instrument(name = "storage_upload", skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        let bucket = self.bucket.as_deref().ok_or(StorageError::MissingBucket)?;

        let mut request = self
            .client
            .post(format!("{}/upload/storage/v1/b/{bucket}/o", self.api_url))
            .query(&[("uploadType", "media"), ("name", key)])
            .header(
                CONTENT_TYPE,
                content_type.unwrap_or("application/octet-stream"),
            )
            .body(bytes);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Storage rejected upload of {key}: {body}");

            return Err(StorageError::Status(status.to_string()));
        }

        Ok(self.object_url(bucket, key))
    }
}
