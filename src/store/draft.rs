//! Draft store: an explicit interface over the partially filled form a user
//! abandons mid-submission. Keeping it behind a trait keeps the pipeline
//! itself stateless; drafts never flow into composition.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::StoreError;
use crate::record::StreetNumber;

/// A partial record: every field optional, nothing validated until submit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_number: Option<StreetNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apartment_info: Option<String>,
}

pub trait DraftStore: Send + Sync {
    fn load(&self, owner_id: &str) -> Result<Option<DraftRecord>, StoreError>;
    fn save(&self, owner_id: &str, draft: &DraftRecord) -> Result<(), StoreError>;
    fn clear(&self, owner_id: &str) -> Result<(), StoreError>;
}

pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("drafts"),
        }
    }

    fn path_for(&self, owner_id: &str) -> PathBuf {
        // Owner ids come from the client; keep only filename-safe characters.
        let safe: String = owner_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self, owner_id: &str) -> Result<Option<DraftRecord>, StoreError> {
        match std::fs::read_to_string(self.path_for(owner_id)) {
            Ok(s) => Ok(Some(serde_json::from_str(&s)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, owner_id: &str, draft: &DraftRecord) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(owner_id), serde_json::to_string_pretty(draft)?)?;
        Ok(())
    }

    fn clear(&self, owner_id: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(owner_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());
        assert_eq!(store.load("u1").unwrap(), None);

        let draft = DraftRecord {
            name: Some("途中まで".into()),
            street_number: Some(StreetNumber::Zero),
            ..DraftRecord::default()
        };
        store.save("u1", &draft).unwrap();
        assert_eq!(store.load("u1").unwrap(), Some(draft));

        store.clear("u1").unwrap();
        assert_eq!(store.load("u1").unwrap(), None);
        // Clearing twice is fine.
        store.clear("u1").unwrap();
    }

    #[test]
    fn owner_ids_cannot_escape_the_drafts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());
        store.save("../../evil", &DraftRecord::default()).unwrap();
        assert!(dir.path().join("drafts").join(".._.._evil.json").exists());
    }
}
