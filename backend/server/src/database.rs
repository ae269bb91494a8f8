//! # Redis
//!
//! Document database for complaint records.
//!
//! ## Requirements
//!
//! - Lookup by PNR
//! - Resubmitting a PNR replaces the whole record, no merging
//! - Listing every record for the operator view
//!
//! ## Implementation
//!
//! - One Redis hash per complaint under `pnrs:<pnr>`, one field per record field
//! - Upsert is `DEL` + `HSET` + `SADD` in a single `MULTI` block, so stale fields never survive
//! - The `pnrs` set indexes every stored PNR for listing
//! - An empty `HGETALL` reply means the record does not exist
//! - Status changes run as one Lua script so a record is never recreated with only a status
use std::collections::HashMap;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, RedisError, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use thiserror::Error;

use crate::complaint::Complaint;

pub const COMPLAINT_KEY_PREFIX: &str = "pnrs:";
pub const COMPLAINT_INDEX: &str = "pnrs";

const FIELD_PNR: &str = "pnr";
const FIELD_SUBJECT: &str = "subject";
const FIELD_IMAGE: &str = "image";
const FIELD_QUERY_GENERATED: &str = "queryGenerated";
const FIELD_STATUS: &str = "status";

/// Sets one field only if the hash already exists. Returns 1 on write, 0 otherwise.
const SET_IF_EXISTS: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    return 1
end
return 0
";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("complaint not found")]
    NotFound,

    #[error("complaint {pnr} is missing field {field}")]
    Corrupt { pnr: String, field: &'static str },

    #[error("redis error: {0}")]
    Redis(#[from] RedisError),
}

#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Creates or fully replaces the record stored under `complaint.pnr`.
    async fn upsert(&self, complaint: &Complaint) -> Result<(), StoreError>;

    async fn get(&self, pnr: &str) -> Result<Complaint, StoreError>;

    /// Every stored record, ordered by PNR.
    async fn list(&self) -> Result<Vec<Complaint>, StoreError>;

    async fn set_status(&self, pnr: &str, status: &str) -> Result<(), StoreError>;
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new().set_number_of_retries(1);

    let client = Client::open(redis_url)?;
    client.get_connection_manager_with_config(config).await
}

pub struct RedisComplaints {
    connection: ConnectionManager,
}

impl RedisComplaints {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ComplaintStore for RedisComplaints {
    async fn upsert(&self, complaint: &Complaint) -> Result<(), StoreError> {
        let key = complaint_key(&complaint.pnr);
        let mut connection = self.connection.clone();

        redis::pipe()
            .atomic()
            .del(&key)
            .hset_multiple(&key, &to_fields(complaint))
            .sadd(COMPLAINT_INDEX, &complaint.pnr)
            .query_async::<()>(&mut connection)
            .await?;

        Ok(())
    }

    async fn get(&self, pnr: &str) -> Result<Complaint, StoreError> {
        let mut connection = self.connection.clone();
        let fields: HashMap<String, String> = connection.hgetall(complaint_key(pnr)).await?;

        if fields.is_empty() {
            return Err(StoreError::NotFound);
        }

        from_fields(pnr, fields)
    }

    async fn list(&self) -> Result<Vec<Complaint>, StoreError> {
        let mut connection = self.connection.clone();
        let mut pnrs: Vec<String> = connection.smembers(COMPLAINT_INDEX).await?;
        pnrs.sort();

        if pnrs.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for pnr in &pnrs {
            pipe.hgetall(complaint_key(pnr));
        }
        let rows: Vec<HashMap<String, String>> = pipe.query_async(&mut connection).await?;

        pnrs.into_iter()
            .zip(rows)
            .filter(|(_, fields)| !fields.is_empty())
            .map(|(pnr, fields)| from_fields(&pnr, fields))
            .collect()
    }

    async fn set_status(&self, pnr: &str, status: &str) -> Result<(), StoreError> {
        let key = complaint_key(pnr);
        let mut connection = self.connection.clone();

        let updated: i64 = Script::new(SET_IF_EXISTS)
            .key(&key)
            .arg(FIELD_STATUS)
            .arg(status)
            .invoke_async(&mut connection)
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

pub fn complaint_key(pnr: &str) -> String {
    format!("{COMPLAINT_KEY_PREFIX}{pnr}")
}

fn to_fields(complaint: &Complaint) -> Vec<(&'static str, &str)> {
    let mut fields = vec![
        (FIELD_PNR, complaint.pnr.as_str()),
        (FIELD_SUBJECT, complaint.subject.as_str()),
        (FIELD_IMAGE, complaint.image.as_str()),
        (FIELD_STATUS, complaint.status.as_str()),
    ];

    if let Some(caption) = &complaint.query_generated {
        fields.push((FIELD_QUERY_GENERATED, caption.as_str()));
    }

    fields
}

fn from_fields(pnr: &str, mut fields: HashMap<String, String>) -> Result<Complaint, StoreError> {
    let mut take = |field: &'static str| {
        fields.remove(field).ok_or_else(|| StoreError::Corrupt {
            pnr: pnr.to_string(),
            field,
        })
    };

    Ok(Complaint {
        pnr: pnr.to_string(),
        subject: take(FIELD_SUBJECT)?,
        image: take(FIELD_IMAGE)?,
        status: take(FIELD_STATUS)?,
        query_generated: take(FIELD_QUERY_GENERATED).ok(),
    })
}
