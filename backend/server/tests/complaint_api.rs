use std::{
    net::SocketAddr,
    sync::{Arc, atomic::Ordering},
};

use madad::{
    build_router,
    caption::Captioner,
    config::Config,
    fake::{CaptionBehavior, FakeCaptioner, FakeComplaintStore, FakeObjectStore, fake_config},
    state::AppState,
};
use reqwest::{
    Client, StatusCode,
    multipart::{Form, Part},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

struct TestServer {
    addr: SocketAddr,
    storage: Arc<FakeObjectStore>,
    captioner: Arc<FakeCaptioner>,
    complaints: Arc<FakeComplaintStore>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

async fn spawn_server(behavior: CaptionBehavior, complaints: FakeComplaintStore) -> TestServer {
    spawn_server_with(fake_config(), behavior, complaints).await
}

async fn spawn_server_with(
    config: Config,
    behavior: CaptionBehavior,
    complaints: FakeComplaintStore,
) -> TestServer {
    let storage = Arc::new(FakeObjectStore::default());
    let captioner = Arc::new(FakeCaptioner::new(behavior));
    let complaints = Arc::new(complaints);
    let state = AppState::with_gateways(
        config,
        storage.clone(),
        Some(captioner.clone() as Arc<dyn Captioner>),
        complaints.clone(),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("listener addr");
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });

    TestServer {
        addr,
        storage,
        captioner,
        complaints,
    }
}

fn complaint_form(pnr: &str, subject: &str, file_name: &str, bytes: &[u8]) -> Form {
    Form::new().text("pnr", pnr.to_string()).text("subject", subject.to_string()).part(
        "image",
        Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")
            .expect("mime"),
    )
}

async fn json_body(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.json::<Value>().await.expect("json body");
    (status, body)
}

#[tokio::test]
async fn submit_then_lookup_returns_stored_record() {
    let server = spawn_server(
        CaptionBehavior::Caption("a train waiting at a platform".to_string()),
        FakeComplaintStore::default(),
    )
    .await;
    let client = Client::new();

    let (status, body) = json_body(
        client
            .post(server.url("/submit-complaint"))
            .multipart(complaint_form("PNR123", "Delay", "photo.jpg", b"b1"))
            .send()
            .await
            .expect("submit"),
    )
    .await;

    let expected = json!({
        "pnr": "PNR123",
        "subject": "Delay",
        "image": "https://storage.test/complaints/images/photo.jpg",
        "queryGenerated": "a train waiting at a platform",
        "status": "Pending",
    });
    let mut submitted = expected.clone();
    submitted["message"] = json!("PNR submitted successfully");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, submitted);
    assert_eq!(
        server.storage.object("images/photo.jpg").await.as_deref(),
        Some(&b"b1"[..])
    );

    let (status, body) = json_body(
        client
            .get(server.url("/get-complaints/PNR123"))
            .send()
            .await
            .expect("lookup"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, expected);
}

#[tokio::test]
async fn submit_without_image_is_client_error() {
    let server = spawn_server(
        CaptionBehavior::Caption("unused".to_string()),
        FakeComplaintStore::default(),
    )
    .await;

    let form = Form::new().text("pnr", "PNR1").text("subject", "Delay");
    let (status, body) = json_body(
        Client::new()
            .post(server.url("/submit-complaint"))
            .multipart(form)
            .send()
            .await
            .expect("submit"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Failed to get image from request" }));
    assert_eq!(server.storage.calls.load(Ordering::Relaxed), 0);
    assert_eq!(server.captioner.calls.load(Ordering::Relaxed), 0);
    assert_eq!(server.complaints.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn caption_failure_is_generic_server_error() {
    let server = spawn_server(
        CaptionBehavior::Status("503 Service Unavailable".to_string()),
        FakeComplaintStore::default(),
    )
    .await;

    let (status, body) = json_body(
        Client::new()
            .post(server.url("/submit-complaint"))
            .multipart(complaint_form("PNR1", "Delay", "a.jpg", b"x"))
            .send()
            .await
            .expect("submit"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to generate image caption" }));
    assert!(server.complaints.record("PNR1").await.is_none());
}

#[tokio::test]
async fn store_failure_is_generic_server_error() {
    let server = spawn_server(
        CaptionBehavior::Caption("c".to_string()),
        FakeComplaintStore::failing(),
    )
    .await;
    let client = Client::new();

    let (status, body) = json_body(
        client
            .post(server.url("/submit-complaint"))
            .multipart(complaint_form("PNR1", "Delay", "a.jpg", b"x"))
            .send()
            .await
            .expect("submit"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to store PNR" }));

    let (status, body) = json_body(
        client
            .get(server.url("/get-complaints/PNR1"))
            .send()
            .await
            .expect("lookup"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to fetch PNR" }));
}

#[tokio::test]
async fn lookup_unknown_and_empty_pnr() {
    let server = spawn_server(
        CaptionBehavior::Caption("c".to_string()),
        FakeComplaintStore::default(),
    )
    .await;
    let client = Client::new();

    let (status, body) = json_body(
        client
            .get(server.url("/get-complaints/UNKNOWN"))
            .send()
            .await
            .expect("lookup"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "PNR not found" }));
    let calls_after_unknown = server.complaints.calls.load(Ordering::Relaxed);

    for path in ["/get-complaints/", "/get-complaints", "/get-complaints/%20"] {
        let (status, body) = json_body(
            client
                .get(server.url(path))
                .send()
                .await
                .expect("lookup"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body, json!({ "error": "PNR is required" }));
    }
    assert_eq!(
        server.complaints.calls.load(Ordering::Relaxed),
        calls_after_unknown
    );
}

#[tokio::test]
async fn resubmission_keeps_one_record() {
    let server = spawn_server(
        CaptionBehavior::Caption("c".to_string()),
        FakeComplaintStore::default(),
    )
    .await;
    let client = Client::new();

    for (subject, file) in [("Delay", "first.jpg"), ("Cleanliness", "second.jpg")] {
        let response = client
            .post(server.url("/submit-complaint"))
            .multipart(complaint_form("PNR7", subject, file, b"x"))
            .send()
            .await
            .expect("submit");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let (_, body) = json_body(
        client
            .get(server.url("/get-complaints/PNR7"))
            .send()
            .await
            .expect("lookup"),
    )
    .await;
    assert_eq!(body["subject"], "Cleanliness");
    assert_eq!(
        body["image"],
        "https://storage.test/complaints/images/second.jpg"
    );
    assert_eq!(server.complaints.records.lock().await.len(), 1);
}

#[tokio::test]
async fn operator_lists_pending_and_changes_status() {
    let server = spawn_server(
        CaptionBehavior::Caption("c".to_string()),
        FakeComplaintStore::default(),
    )
    .await;
    let client = Client::new();

    let (status, body) = json_body(
        client
            .get(server.url("/admin/pending-complaints"))
            .send()
            .await
            .expect("pending"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "message": "No pending complaints found", "pendingComplaints": [] })
    );

    for pnr in ["PNR1", "PNR2"] {
        client
            .post(server.url("/submit-complaint"))
            .multipart(complaint_form(pnr, "Delay", "a.jpg", b"x"))
            .send()
            .await
            .expect("submit");
    }

    let (status, body) = json_body(
        client
            .patch(server.url("/admin/complaints/PNR1/status"))
            .json(&json!({ "newStatus": "Resolved" }))
            .send()
            .await
            .expect("status"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "message": "Complaint status updated successfully" })
    );

    let (_, body) = json_body(
        client
            .get(server.url("/admin/pending-complaints"))
            .send()
            .await
            .expect("pending"),
    )
    .await;
    let pending = body["pendingComplaints"].as_array().expect("array");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["pnr"], "PNR2");
    assert!(body.get("message").is_none());

    let (status, _) = json_body(
        client
            .patch(server.url("/admin/complaints/NOPE/status"))
            .json(&json!({ "newStatus": "Resolved" }))
            .send()
            .await
            .expect("status"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = json_body(
        client
            .patch(server.url("/admin/complaints/PNR2/status"))
            .json(&json!({ "newStatus": "" }))
            .send()
            .await
            .expect("status"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Status is required" }));
}

#[tokio::test]
async fn status_change_without_new_status_is_client_error() {
    let server = spawn_server(
        CaptionBehavior::Caption("c".to_string()),
        FakeComplaintStore::default(),
    )
    .await;
    let client = Client::new();

    let (status, body) = json_body(
        client
            .patch(server.url("/admin/complaints/PNR1/status"))
            .json(&json!({}))
            .send()
            .await
            .expect("status"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Status is required" }));

    let (status, body) = json_body(
        client
            .patch(server.url("/admin/complaints/PNR1/status"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .expect("status"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Status is required" }));
    assert_eq!(server.complaints.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn submit_without_multipart_body_is_json_error() {
    let server = spawn_server(
        CaptionBehavior::Caption("c".to_string()),
        FakeComplaintStore::default(),
    )
    .await;

    let (status, body) = json_body(
        Client::new()
            .post(server.url("/submit-complaint"))
            .body("x")
            .send()
            .await
            .expect("submit"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Malformed payload" }));
    assert_eq!(server.storage.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected_before_any_gateway() {
    let mut config = fake_config();
    config.max_upload_bytes = 1024;
    let server = spawn_server_with(
        config,
        CaptionBehavior::Caption("c".to_string()),
        FakeComplaintStore::default(),
    )
    .await;

    let (status, body) = json_body(
        Client::new()
            .post(server.url("/submit-complaint"))
            .multipart(complaint_form("PNR1", "Delay", "big.jpg", &[0u8; 4096]))
            .send()
            .await
            .expect("submit"),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({ "error": "Image too large" }));
    assert_eq!(server.storage.calls.load(Ordering::Relaxed), 0);
    assert_eq!(server.captioner.calls.load(Ordering::Relaxed), 0);
    assert_eq!(server.complaints.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn liveness() {
    let server = spawn_server(
        CaptionBehavior::Caption("c".to_string()),
        FakeComplaintStore::default(),
    )
    .await;

    let response = Client::new()
        .get(server.url("/"))
        .send()
        .await
        .expect("liveness");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text().await.expect("text"),
        "Complaint service is running"
    );
}
