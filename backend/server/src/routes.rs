use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    complaint::{Complaint, MessageResponse, PendingResponse, StatusChange, SubmitResponse},
    error::AppError,
    state::AppState,
    utils::read_complaint_form,
    workflow::{change_status, lookup_complaint, pending_complaints, submit_complaint},
};

pub async fn hello_handler() -> impl IntoResponse {
    (StatusCode::OK, "Complaint service is running")
}

pub async fn submit_complaint_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let form = read_complaint_form(multipart?).await?;
    let complaint = submit_complaint(&state, form).await?;

    Ok(Json(SubmitResponse {
        message: "PNR submitted successfully",
        complaint,
    }))
}

pub async fn get_complaints_handler(
    State(state): State<Arc<AppState>>,
    Path(pnr): Path<String>,
) -> Result<Json<Complaint>, AppError> {
    lookup_complaint(&state, &pnr).await.map(Json)
}

/// `/get-complaints/` with nothing after the slash.
pub async fn get_complaints_without_pnr_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Complaint>, AppError> {
    lookup_complaint(&state, "").await.map(Json)
}

pub async fn pending_complaints_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PendingResponse>, AppError> {
    let pending = pending_complaints(&state).await?;

    Ok(Json(PendingResponse {
        message: pending
            .is_empty()
            .then_some("No pending complaints found"),
        pending_complaints: pending,
    }))
}

pub async fn change_status_handler(
    State(state): State<Arc<AppState>>,
    Path(pnr): Path<String>,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(payload) = payload?;
    change_status(&state, &pnr, &payload.new_status).await?;

    Ok(Json(MessageResponse {
        message: "Complaint status updated successfully",
    }))
}
