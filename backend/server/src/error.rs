use std::error::Error as _;

use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{caption::CaptionError, database::StoreError, storage::StorageError};

/// Everything a request can fail with. The display text is what the caller
/// sees; upstream detail stays in the logs.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to get image from request")]
    MissingImage,

    #[error("PNR is required")]
    MissingPnr,

    #[error("Status is required")]
    MissingStatus,

    #[error("Status is required")]
    InvalidStatusBody(#[from] JsonRejection),

    #[error("Malformed payload")]
    MalformedPayload(#[source] MultipartError),

    #[error("Malformed payload")]
    NotMultipart(#[from] MultipartRejection),

    #[error("Image too large")]
    TooLarge(#[source] MultipartError),

    #[error("PNR not found")]
    NotFound,

    #[error("Failed to upload image")]
    Upload(#[from] StorageError),

    #[error("Failed to generate image caption")]
    Caption(#[from] CaptionError),

    #[error("Failed to store PNR")]
    Store(#[source] StoreError),

    #[error("Failed to fetch PNR")]
    Fetch(#[source] StoreError),

    #[error("Failed to update complaint status")]
    UpdateStatus(#[source] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingImage | AppError::MissingPnr | AppError::MissingStatus => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidStatusBody(_) => StatusCode::BAD_REQUEST,
            AppError::MalformedPayload(e) | AppError::TooLarge(e) => e.status(),
            AppError::NotMultipart(e) => e.status(),
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Upload(_)
            | AppError::Caption(_)
            | AppError::Store(_)
            | AppError::Fetch(_)
            | AppError::UpdateStatus(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::TooLarge(e)
        } else {
            AppError::MalformedPayload(e)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self.source() {
            Some(source) if status.is_server_error() => error!("{}: {source}", self),
            Some(source) => warn!("{}: {source}", self),
            None => warn!("Rejected request: {}", self),
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
