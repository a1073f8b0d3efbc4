//! Asset source: resolves the fixed set of decorative card images and the
//! font files to byte content. Decorative lookups are non-fatal: a missing
//! file is logged and the slot degrades to a placeholder downstream.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rusttype::Font;
use thiserror::Error;
use tracing::warn;

use crate::blob::EmbeddableBlob;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {name}: {source}")]
    Read { name: String, source: std::io::Error },
    #[error("failed to parse font {0}")]
    BadFont(String),
}

/// The fixed decorative assets a certificate is composed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    BackgroundPattern,
    CardBase,
    PhotoFrame,
    CityCrest,
    MayorSeal,
    DepartmentBanner,
    Barcode,
    OrnamentLine,
    SideOrnament,
    Logo,
}

impl AssetKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            AssetKind::BackgroundPattern => "background.png",
            AssetKind::CardBase => "card_base.png",
            AssetKind::PhotoFrame => "photo_frame.png",
            AssetKind::CityCrest => "crest.png",
            AssetKind::MayorSeal => "mayor_seal.png",
            AssetKind::DepartmentBanner => "department.png",
            AssetKind::Barcode => "barcode.png",
            AssetKind::OrnamentLine => "ornament_line.png",
            AssetKind::SideOrnament => "side_ornament.png",
            AssetKind::Logo => "logo.png",
        }
    }
}

/// All optional visual slots, pre-resolved for one composition.
#[derive(Debug, Clone, Default)]
pub struct CardAssets {
    pub background: Option<EmbeddableBlob>,
    pub card_base: Option<EmbeddableBlob>,
    pub photo_frame: Option<EmbeddableBlob>,
    pub crest: Option<EmbeddableBlob>,
    pub mayor_seal: Option<EmbeddableBlob>,
    pub department: Option<EmbeddableBlob>,
    pub barcode: Option<EmbeddableBlob>,
    pub ornament_line: Option<EmbeddableBlob>,
    pub side_ornament: Option<EmbeddableBlob>,
    pub logo: Option<EmbeddableBlob>,
}

/// A font loaded for rendering: parsed for measurement, raw bytes kept for
/// embedding into the SVG output.
#[derive(Clone)]
pub struct LoadedFont {
    pub bytes: Arc<Vec<u8>>,
    pub font: Arc<Font<'static>>,
}

#[derive(Clone, Default)]
pub struct FontSet {
    pub serif: Option<LoadedFont>,
    pub sans: Option<LoadedFont>,
}

static BLOB_CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<EmbeddableBlob>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static FONT_CACHE: Lazy<Mutex<HashMap<PathBuf, LoadedFont>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Clone)]
pub struct AssetSource {
    dir: PathBuf,
}

impl AssetSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default assets directory: `$ASSETS_DIR`, falling back to `assets/`
    /// next to the manifest.
    pub fn from_env() -> Self {
        let dir = std::env::var("ASSETS_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            Path::new(env!("CARGO_MANIFEST_DIR")).join("assets")
        });
        Self::new(dir)
    }

    pub fn load(&self, kind: AssetKind) -> Result<Arc<EmbeddableBlob>, AssetError> {
        let path = self.dir.join(kind.file_name());
        if let Some(blob) = BLOB_CACHE.lock().get(&path) {
            return Ok(Arc::clone(blob));
        }
        let bytes = std::fs::read(&path).map_err(|source| AssetError::Read {
            name: kind.file_name().to_string(),
            source,
        })?;
        let blob = Arc::new(EmbeddableBlob::new(mime_for(&path), bytes));
        BLOB_CACHE.lock().insert(path, Arc::clone(&blob));
        Ok(blob)
    }

    /// Decorative lookup: failures downgrade to `None` so composition can
    /// proceed without the element.
    pub fn load_optional(&self, kind: AssetKind) -> Option<EmbeddableBlob> {
        match self.load(kind) {
            Ok(blob) => Some((*blob).clone()),
            Err(e) => {
                warn!("decorative asset unavailable, rendering without it: {e}");
                None
            }
        }
    }

    pub fn card_assets(&self) -> CardAssets {
        CardAssets {
            background: self.load_optional(AssetKind::BackgroundPattern),
            card_base: self.load_optional(AssetKind::CardBase),
            photo_frame: self.load_optional(AssetKind::PhotoFrame),
            crest: self.load_optional(AssetKind::CityCrest),
            mayor_seal: self.load_optional(AssetKind::MayorSeal),
            department: self.load_optional(AssetKind::DepartmentBanner),
            barcode: self.load_optional(AssetKind::Barcode),
            ornament_line: self.load_optional(AssetKind::OrnamentLine),
            side_ornament: self.load_optional(AssetKind::SideOrnament),
            logo: self.load_optional(AssetKind::Logo),
        }
    }

    pub fn load_font(&self, file_name: &str) -> Result<LoadedFont, AssetError> {
        let path = self.dir.join("fonts").join(file_name);
        if let Some(f) = FONT_CACHE.lock().get(&path) {
            return Ok(f.clone());
        }
        let bytes = std::fs::read(&path).map_err(|source| AssetError::Read {
            name: file_name.to_string(),
            source,
        })?;
        let font = Font::try_from_vec(bytes.clone())
            .ok_or_else(|| AssetError::BadFont(file_name.to_string()))?;
        let loaded = LoadedFont {
            bytes: Arc::new(bytes),
            font: Arc::new(font),
        };
        FONT_CACHE.lock().insert(path, loaded.clone());
        Ok(loaded)
    }

    /// Fonts are optional at render time: a missing file falls back to the
    /// generic family declaration in the SVG.
    pub fn font_set(&self) -> FontSet {
        let load = |name: &str| match self.load_font(name) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!("font unavailable, falling back to generic family: {e}");
                None
            }
        };
        FontSet {
            serif: load("NotoSerifJP-Regular.ttf"),
            sans: load("NotoSansJP-Regular.ttf"),
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(e) if e.eq_ignore_ascii_case("png") => "image/png",
        Some(e) if e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg") => "image/jpeg",
        Some(e) if e.eq_ignore_ascii_case("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_decorative_asset_degrades_to_none() {
        let src = AssetSource::new("/nonexistent/assets");
        assert!(src.load_optional(AssetKind::Logo).is_none());
    }

    #[test]
    fn missing_font_set_is_empty_not_fatal() {
        let src = AssetSource::new("/nonexistent/assets");
        let fonts = src.font_set();
        assert!(fonts.serif.is_none());
        assert!(fonts.sans.is_none());
    }

    #[test]
    fn load_reads_and_caches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.png"), b"\x89PNGfake").unwrap();
        let src = AssetSource::new(dir.path());
        let blob = src.load(AssetKind::Logo).unwrap();
        assert_eq!(blob.mime, "image/png");
        assert_eq!(blob.bytes, b"\x89PNGfake");
        // Second load comes from cache even if the file disappears.
        std::fs::remove_file(dir.path().join("logo.png")).unwrap();
        assert!(src.load(AssetKind::Logo).is_ok());
    }
}
