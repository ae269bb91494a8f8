//! In-memory gateways for exercising the workflows and the router without
//! Redis, a bucket or an inference endpoint.
use std::{
    collections::HashMap,
    io,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use axum::body::Bytes;
use redis::RedisError;
use tokio::sync::Mutex;

use crate::{
    caption::{CaptionError, Captioner},
    complaint::Complaint,
    config::Config,
    database::{ComplaintStore, StoreError},
    storage::{ObjectStore, StorageError},
};

pub const FAKE_PUBLIC_URL: &str = "https://storage.test";
pub const FAKE_BUCKET: &str = "complaints";

/// Config with captioning on and every external endpoint pointing nowhere.
pub fn fake_config() -> Config {
    Config::from_lookup(|key| match key {
        "HUGGING_FACE_API_KEY" => Some("hf_test".to_string()),
        "GCS_BUCKET_NAME" => Some(FAKE_BUCKET.to_string()),
        "STORAGE_PUBLIC_URL" => Some(FAKE_PUBLIC_URL.to_string()),
        "SECRETS_DIR" => Some("/nonexistent".to_string()),
        "PORT" => Some("0".to_string()),
        _ => None,
    })
    .unwrap_or_else(|e| panic!("fake config must load: {e}"))
}

pub struct FakeObjectStore {
    pub objects: Mutex<HashMap<String, Bytes>>,
    pub calls: AtomicU64,
    pub fail: AtomicBool,
}

impl Default for FakeObjectStore {
    fn default() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            calls: AtomicU64::new(0),
            fail: AtomicBool::new(false),
        }
    }
}

impl FakeObjectStore {
    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        _content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail.load(Ordering::Relaxed) {
            return Err(StorageError::Status("503 Service Unavailable".to_string()));
        }

        self.objects.lock().await.insert(key.to_string(), bytes);

        Ok(format!("{FAKE_PUBLIC_URL}/{FAKE_BUCKET}/{key}"))
    }
}

pub enum CaptionBehavior {
    Caption(String),
    Status(String),
    Empty,
    InvalidFormat,
}

pub struct FakeCaptioner {
    pub behavior: CaptionBehavior,
    pub seen: Mutex<Vec<Bytes>>,
    pub calls: AtomicU64,
}

impl FakeCaptioner {
    pub fn new(behavior: CaptionBehavior) -> Self {
        Self {
            behavior,
            seen: Mutex::new(Vec::new()),
            calls: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Captioner for FakeCaptioner {
    async fn caption(&self, image: Bytes) -> Result<String, CaptionError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.seen.lock().await.push(image);

        match &self.behavior {
            CaptionBehavior::Caption(text) => Ok(text.clone()),
            CaptionBehavior::Status(status) => Err(CaptionError::Status(status.clone())),
            CaptionBehavior::Empty => Err(CaptionError::Empty),
            CaptionBehavior::InvalidFormat => {
                Err(CaptionError::InvalidFormat(r#"{"label":"train"}"#.to_string()))
            }
        }
    }
}

pub struct FakeComplaintStore {
    pub records: Mutex<HashMap<String, Complaint>>,
    pub calls: AtomicU64,
    pub fail: bool,
}

impl Default for FakeComplaintStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            calls: AtomicU64::new(0),
            fail: false,
        }
    }
}

impl FakeComplaintStore {
    /// Every operation fails as if Redis were unreachable.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn record(&self, pnr: &str) -> Option<Complaint> {
        self.records.lock().await.get(pnr).cloned()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            let io_error = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
            return Err(StoreError::Redis(RedisError::from(io_error)));
        }

        Ok(())
    }
}

#[async_trait]
impl ComplaintStore for FakeComplaintStore {
    async fn upsert(&self, complaint: &Complaint) -> Result<(), StoreError> {
        self.enter()?;
        self.records
            .lock()
            .await
            .insert(complaint.pnr.clone(), complaint.clone());

        Ok(())
    }

    async fn get(&self, pnr: &str) -> Result<Complaint, StoreError> {
        self.enter()?;
        self.record(pnr).await.ok_or(StoreError::NotFound)
    }

    async fn list(&self) -> Result<Vec<Complaint>, StoreError> {
        self.enter()?;
        let mut complaints: Vec<Complaint> = self.records.lock().await.values().cloned().collect();
        complaints.sort_by(|a, b| a.pnr.cmp(&b.pnr));

        Ok(complaints)
    }

    async fn set_status(&self, pnr: &str, status: &str) -> Result<(), StoreError> {
        self.enter()?;
        let mut records = self.records.lock().await;
        let complaint = records.get_mut(pnr).ok_or(StoreError::NotFound)?;
        complaint.status = status.to_string();

        Ok(())
    }
}
