use serde::{Deserialize, Serialize};

/// Status every complaint is created with.
pub const PENDING: &str = "Pending";

/// A complaint record, keyed by `pnr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub pnr: String,
    pub subject: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_generated: Option<String>,
    pub status: String,
}

impl Complaint {
    pub fn pending(
        pnr: String,
        subject: String,
        image: String,
        query_generated: Option<String>,
    ) -> Self {
        Self {
            pnr,
            subject,
            image,
            query_generated,
            status: PENDING.to_string(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PENDING
    }
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub complaint: Complaint,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub pending_complaints: Vec<Complaint>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub new_status: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
