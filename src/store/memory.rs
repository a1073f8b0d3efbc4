//! In-memory backend: the "no persistence" store, also what the tests run
//! against.

use parking_lot::Mutex;

use super::{issue, RecordStore, StoreError};
use crate::record::{CardRecord, NewRecord};

#[derive(Default)]
struct Inner {
    records: Vec<CardRecord>,
    next_number: u32,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    inner: Mutex<Inner>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn create(&self, fields: NewRecord) -> Result<CardRecord, StoreError> {
        let mut inner = self.inner.lock();
        inner.next_number += 1;
        let record = issue(fields, inner.next_number);
        inner.records.push(record.clone());
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StreetNumber;

    fn fields(owner: &str, name: &str) -> NewRecord {
        NewRecord {
            owner_id: owner.into(),
            name: name.into(),
            photo_url: "photos/u/1.jpg".into(),
            street_number: StreetNumber::First,
            address_line: "4-5-6".into(),
            apartment_info: Some("201号室".into()),
        }
    }

    #[test]
    fn create_then_get_round_trips_every_field() {
        let store = MemoryRecordStore::new();
        let created = store.create(fields("u1", "花譜")).unwrap();
        let fetched = store.get(&created.id).unwrap();
        assert_eq!(
            serde_json::to_value(&created).unwrap(),
            serde_json::to_value(&fetched).unwrap()
        );
    }

    #[test]
    fn resident_numbers_are_sequential_and_positive() {
        let store = MemoryRecordStore::new();
        let a = store.create(fields("u1", "a")).unwrap();
        let b = store.create(fields("u1", "b")).unwrap();
        assert_eq!(a.resident_number, 1);
        assert_eq!(b.resident_number, 2);
    }

    #[test]
    fn list_is_newest_first_and_owner_scoped() {
        let store = MemoryRecordStore::new();
        let a = store.create(fields("u1", "a")).unwrap();
        let b = store.create(fields("u1", "b")).unwrap();
        store.create(fields("u2", "other")).unwrap();
        let listed = store.list_by_owner("u1").unwrap();
        assert_eq!(
            listed.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec![b.id.as_str(), a.id.as_str()]
        );
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = MemoryRecordStore::new();
        assert!(matches!(
            store.get("missing"),
            Err(StoreError::NotFound(_))
        ));
    }
}
