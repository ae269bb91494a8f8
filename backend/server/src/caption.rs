//! # Captioning
//!
//! Image captions come from a hosted image-to-text model (BLIP large by default).
//!
//! ## Contract
//!
//! - Request: raw image bytes, `application/octet-stream`, bearer credential
//! - Response: JSON array, first element carries `generated_text`
//! - Anything else fails the submission; nothing is retried
use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("inference API error: {0}")]
    Status(String),

    #[error("no response received")]
    Empty,

    #[error("invalid response format: {0}")]
    InvalidFormat(String),

    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed inference response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: Bytes) -> Result<String, CaptionError>;
}

pub struct InferenceCaptioner {
    client: Client,
    api_url: String,
    api_key: String,
}

impl InferenceCaptioner {
    pub fn new(client: Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl Captioner for InferenceCaptioner {
    #[instrument(name = "caption_image", skip_all, fields(size = image.len()))]
    async fn caption(&self, image: Bytes) -> Result<String, CaptionError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CaptionError::Status(status.to_string()));
        }

        let body = response.bytes().await?;
        debug!("Inference API response: {}", String::from_utf8_lossy(&body));

        parse_caption(&body)
    }
}

pub fn parse_caption(body: &[u8]) -> Result<String, CaptionError> {
    let results: Vec<Value> = serde_json::from_slice(body)?;
    let first = results.first().ok_or(CaptionError::Empty)?;

    first
        .get("generated_text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CaptionError::InvalidFormat(first.to_string()))
}
