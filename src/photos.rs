//! Uploaded-photo storage and retrieval. Saved photos are already
//! normalized; retrieval hands raw bytes back to the pipeline, which
//! re-normalizes so remote and local photos go through the same path.

use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::normalize::NormalizedPhoto;

#[derive(Clone)]
pub struct PhotoStore {
    data_dir: PathBuf,
}

impl PhotoStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Persist a normalized photo and return the url recorded on the card.
    pub fn save(&self, owner_id: &str, photo: &NormalizedPhoto) -> std::io::Result<String> {
        let safe_owner: String = owner_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') { c } else { '_' })
            .collect();
        let rel = format!("photos/{safe_owner}/{}.jpg", Uuid::new_v4());
        let path = self.data_dir.join(&rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &photo.blob().bytes)?;
        Ok(rel)
    }

    /// Fetch the photo behind a record's `photo_url`: http(s) urls go through
    /// the shared client, anything else is read relative to the data dir.
    /// Failures degrade to `None`; the card renders with a placeholder.
    pub async fn resolve(&self, http: &reqwest::Client, url: &str) -> Option<Vec<u8>> {
        if url.trim().is_empty() {
            return None;
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            match fetch(http, url).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("photo fetch failed, rendering without it: {e}");
                    None
                }
            }
        } else {
            match std::fs::read(self.data_dir.join(url)) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("photo read failed, rendering without it: {e}");
                    None
                }
            }
        }
    }
}

async fn fetch(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, String> {
    let resp = http.get(url).send().await.map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("status {}", resp.status()));
    }
    let bytes = resp.bytes().await.map_err(|e| e.to_string())?;
    Ok(bytes.to_vec())
}
