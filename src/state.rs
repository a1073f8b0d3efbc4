use std::{path::PathBuf, sync::Arc};

use crate::assets::AssetSource;
use crate::normalize::NormalizeConfig;
use crate::photos::PhotoStore;
use crate::store::draft::{DraftStore, FileDraftStore};
use crate::store::file::FileRecordStore;
use crate::store::memory::MemoryRecordStore;
use crate::store::{RecordStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub store: Arc<dyn RecordStore>,
    pub drafts: Arc<dyn DraftStore>,
    pub assets: AssetSource,
    pub photos: PhotoStore,
    pub normalize: NormalizeConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to open record store in {dir}: {source}")]
    OpenStore { dir: PathBuf, source: StoreError },
}

impl AppState {
    /// Build the application state from the environment: `DATA_DIR` for
    /// records/drafts/photos (default `data/`), `ASSETS_DIR` for decorative
    /// images and fonts, `STORE_BACKEND=file|memory`.
    pub fn load() -> Result<Self, StateError> {
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let backend = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "file".to_string());
        let store: Arc<dyn RecordStore> = if backend.eq_ignore_ascii_case("memory") {
            Arc::new(MemoryRecordStore::new())
        } else {
            Arc::new(
                FileRecordStore::open(&data_dir).map_err(|source| StateError::OpenStore {
                    dir: data_dir.clone(),
                    source,
                })?,
            )
        };

        Ok(Self {
            http: reqwest::Client::new(),
            store,
            drafts: Arc::new(FileDraftStore::new(&data_dir)),
            assets: AssetSource::from_env(),
            photos: PhotoStore::new(&data_dir),
            normalize: NormalizeConfig::default(),
        })
    }
}
