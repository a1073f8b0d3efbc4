use crate::util;

/// Self-describing embeddable image payload: mime type + encoded bytes.
/// This is the currency between the normalizer, the asset source and the
/// layout tree. Consumers embed it as a data URI and never re-decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddableBlob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl EmbeddableBlob {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { mime: mime.into(), bytes }
    }

    pub fn data_uri(&self) -> String {
        util::to_data_uri(&self.mime, &self.bytes)
    }
}
