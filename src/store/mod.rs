//! Record persistence. The pipeline only sees the `RecordStore` trait; the
//! backing mechanism (JSON flat file, in-memory) is swappable and carries no
//! guarantees beyond what the trait states.

pub mod draft;
pub mod file;
pub mod memory;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::record::{CardRecord, NewRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait RecordStore: Send + Sync {
    /// Assigns id, resident number and timestamps. Records are immutable
    /// once created; "updates" go through `create` again (append-only).
    fn create(&self, fields: NewRecord) -> Result<CardRecord, StoreError>;
    fn get(&self, id: &str) -> Result<CardRecord, StoreError>;
    /// Newest first.
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<CardRecord>, StoreError>;
}

/// Materialize a record from submitted fields and a store-assigned number.
pub(crate) fn issue(fields: NewRecord, resident_number: u32) -> CardRecord {
    let now = Utc::now();
    CardRecord {
        id: Uuid::new_v4().to_string(),
        owner_id: fields.owner_id,
        resident_number,
        name: fields.name,
        photo_url: fields.photo_url,
        street_number: fields.street_number,
        address_line: fields.address_line,
        apartment_info: fields.apartment_info,
        created_at: now,
        updated_at: now,
    }
}
