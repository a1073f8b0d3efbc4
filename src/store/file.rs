//! JSON flat-file backend. The whole store lives in one pretty-printed file
//! so it stays hand-inspectable; every create rewrites it. A missing file is
//! an empty store, not an error.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{issue, RecordStore, StoreError};
use crate::record::{CardRecord, NewRecord};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    next_number: u32,
    records: Vec<CardRecord>,
}

pub struct FileRecordStore {
    path: PathBuf,
    inner: Mutex<StoreFile>,
}

impl FileRecordStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = dir.as_ref().join("residents.json");
        let inner = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    fn persist(&self, inner: &StoreFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(inner)?)?;
        Ok(())
    }
}

impl RecordStore for FileRecordStore {
    fn create(&self, fields: NewRecord) -> Result<CardRecord, StoreError> {
        let mut inner = self.inner.lock();
        inner.next_number += 1;
        let record = issue(fields, inner.next_number);
        inner.records.push(record.clone());
        self.persist(&inner)?;
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<CardRecord, StoreError> {
        self.inner
            .lock()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<CardRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .records
            .iter()
            .rev()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }
}
