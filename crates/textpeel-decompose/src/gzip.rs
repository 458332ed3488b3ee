//! Gzip decompression: one compressed stream becomes one child.

use async_trait::async_trait;
use flate2::read::MultiGzDecoder;
use textpeel_core::{Children, Data, DecomposeError, Decomposer};

const MIME_TYPES: &[&str] = &[
    "application/gzip",
    "application/x-gzip",
    "application/x-gtar-compressed",
];

pub struct Gzip;

impl Gzip {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Gzip {
    fn default() -> Self {
        Self::new()
    }
}

/// `archive.tar.gz` → `archive.tar`, `archive.tgz` → `archive.tar`,
/// anything else keeps the parent URI.
fn decompressed_uri(uri: &str) -> String {
    if let Some(stripped) = uri.strip_suffix(".gz") {
        stripped.to_string()
    } else if let Some(stripped) = uri.strip_suffix(".tgz") {
        format!("{stripped}.tar")
    } else {
        uri.to_string()
    }
}

#[async_trait]
impl Decomposer for Gzip {
    fn name(&self) -> &str {
        "gzip"
    }

    fn target_score(&self, data: &Data) -> Option<i32> {
        let by_mime = data
            .mime_type()
            .is_some_and(|mime| MIME_TYPES.contains(&mime));
        let by_extension = matches!(data.extension().as_deref(), Some("gz" | "tgz"));
        (by_mime || by_extension).then_some(-1)
    }

    async fn decompose(
        &self,
        data: &Data,
        children: &mut Children,
    ) -> Result<(), DecomposeError> {
        let decoder = MultiGzDecoder::new(data.open()?);
        let mut child = Data::from_reader(decoder)?;
        if let Some(uri) = data.uri() {
            child.set_uri(decompressed_uri(uri));
        }
        children.push(child);
        Ok(())
    }
}
