//! Tar unpacking: each regular file entry becomes one child.

use async_trait::async_trait;
use textpeel_core::{uri, Children, Data, DecomposeError, Decomposer};

pub struct Tar;

impl Tar {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Tar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Decomposer for Tar {
    fn name(&self) -> &str {
        "tar"
    }

    fn target_score(&self, data: &Data) -> Option<i32> {
        let by_mime = data.mime_type() == Some("application/x-tar");
        let by_extension = data.extension().as_deref() == Some("tar");
        (by_mime || by_extension).then_some(-1)
    }

    async fn decompose(
        &self,
        data: &Data,
        children: &mut Children,
    ) -> Result<(), DecomposeError> {
        let mut archive = ::tar::Archive::new(data.open()?);
        for entry in archive.entries()? {
            let entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            // Raw bytes: entry names are not guaranteed to be UTF-8.
            let entry_path = entry.path_bytes().into_owned();
            let mut child = Data::from_reader(entry)?;
            child.set_uri(uri::child_uri(data.uri_or_empty(), &entry_path));
            children.push(child);
        }
        Ok(())
    }
}
