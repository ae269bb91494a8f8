//! Complaint submission and lookup.
//!
//! Submission is a straight line: upload, caption, upsert. The first failing
//! step ends the request and nothing already done is undone, so an image can
//! outlive a failed database write.
use tracing::info;

use crate::{
    complaint::Complaint,
    database::StoreError,
    error::AppError,
    state::AppState,
    utils::{ComplaintForm, image_key},
};

pub async fn submit_complaint(state: &AppState, form: ComplaintForm) -> Result<Complaint, AppError> {
    let image = form.image.ok_or(AppError::MissingImage)?;
    if form.pnr.trim().is_empty() {
        return Err(AppError::MissingPnr);
    }

    info!(pnr = %form.pnr, file_name = %image.file_name, "Received complaint");

    let key = image_key(&form.pnr, &image.file_name, state.config.unique_image_keys);
    let image_url = state
        .storage
        .upload(&key, image.bytes.clone(), image.content_type.as_deref())
        .await?;
    info!(pnr = %form.pnr, %image_url, "Image uploaded");

    let query_generated = match &state.captioner {
        Some(captioner) => Some(captioner.caption(image.bytes).await?),
        None => None,
    };

    let complaint = Complaint::pending(form.pnr, form.subject, image_url, query_generated);
    state
        .complaints
        .upsert(&complaint)
        .await
        .map_err(AppError::Store)?;
    info!(pnr = %complaint.pnr, "Complaint stored");

    Ok(complaint)
}

pub async fn lookup_complaint(state: &AppState, pnr: &str) -> Result<Complaint, AppError> {
    if pnr.trim().is_empty() {
        return Err(AppError::MissingPnr);
    }

    state.complaints.get(pnr).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound,
        e => AppError::Fetch(e),
    })
}

pub async fn pending_complaints(state: &AppState) -> Result<Vec<Complaint>, AppError> {
    let complaints = state.complaints.list().await.map_err(AppError::Fetch)?;

    Ok(complaints.into_iter().filter(Complaint::is_pending).collect())
}

pub async fn change_status(state: &AppState, pnr: &str, status: &str) -> Result<(), AppError> {
    if pnr.trim().is_empty() {
        return Err(AppError::MissingPnr);
    }
    let status = status.trim();
    if status.is_empty() {
        return Err(AppError::MissingStatus);
    }

    state
        .complaints
        .set_status(pnr, status)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound,
            e => AppError::UpdateStatus(e),
        })?;
    info!(%pnr, %status, "Complaint status changed");

    Ok(())
}
