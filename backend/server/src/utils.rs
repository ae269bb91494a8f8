use axum::{body::Bytes, extract::Multipart};
use chrono::Utc;

use crate::error::AppError;

pub const IMAGE_PREFIX: &str = "images/";

pub const FIELD_PNR: &str = "pnr";
pub const FIELD_SUBJECT: &str = "subject";
pub const FIELD_IMAGE: &str = "image";

#[derive(Default)]
pub struct ComplaintForm {
    pub pnr: String,
    pub subject: String,
    pub image: Option<ImageUpload>,
}

pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Drains the multipart body. Unknown fields are skipped and an `image` part
/// without a file name does not count as an upload.
pub async fn read_complaint_form(mut multipart: Multipart) -> Result<ComplaintForm, AppError> {
    let mut form = ComplaintForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            FIELD_PNR => form.pnr = field.text().await?,
            FIELD_SUBJECT => form.subject = field.text().await?,
            FIELD_IMAGE => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;

                form.image = file_name.map(|file_name| ImageUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Storage key for an uploaded image. Plain keys reuse the client's file
/// name as-is, so equal names overwrite each other.
pub fn image_key(pnr: &str, file_name: &str, unique: bool) -> String {
    if unique {
        format!(
            "{IMAGE_PREFIX}{pnr}-{}-{file_name}",
            Utc::now().timestamp_millis()
        )
    } else {
        format!("{IMAGE_PREFIX}{file_name}")
    }
}
