//! Zip unpacking: each stored file entry becomes one child.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use textpeel_core::{uri, Children, Data, DecomposeError, Decomposer};
use zip::result::ZipError;
use zip::ZipArchive;

pub struct Zip;

impl Zip {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Zip {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn map_zip_error(error: ZipError, data: &Data) -> DecomposeError {
    match error {
        ZipError::UnsupportedArchive(message) if message.contains("Password") => {
            DecomposeError::Encrypted {
                uri: data.uri_or_empty().to_string(),
                mime_type: data.mime_type().unwrap_or("application/zip").to_string(),
            }
        }
        ZipError::Io(io) => DecomposeError::Io(io),
        other => DecomposeError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            other,
        )),
    }
}

#[async_trait]
impl Decomposer for Zip {
    fn name(&self) -> &str {
        "zip"
    }

    fn target_score(&self, data: &Data) -> Option<i32> {
        let by_mime = data.mime_type() == Some("application/zip");
        let by_extension = data.extension().as_deref() == Some("zip");
        (by_mime || by_extension).then_some(-1)
    }

    async fn decompose(
        &self,
        data: &Data,
        children: &mut Children,
    ) -> Result<(), DecomposeError> {
        let body = data.body()?;
        let mut archive =
            ZipArchive::new(Cursor::new(body.as_ref())).map_err(|e| map_zip_error(e, data))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| map_zip_error(e, data))?;
            if entry.is_dir() {
                continue;
            }
            let entry_path = entry.name_raw().to_vec();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            let mut child = Data::from_bytes(bytes);
            child.set_uri(uri::child_uri(data.uri_or_empty(), &entry_path));
            children.push(child);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::unstable::write::FileOptionsExt;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub(crate) fn zipped(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, body) in entries {
            writer
                .start_file(*path, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_target() {
        let zip = Zip::new();
        let mut data = Data::from_bytes(vec![]);
        data.set_uri("box.zip");
        assert_eq!(zip.target_score(&data), Some(-1));
        data.set_uri("box.tar");
        assert_eq!(zip.target_score(&data), None);
    }

    #[tokio::test]
    async fn test_decompose_entries() {
        let zip = Zip::new();
        let mut data = Data::from_bytes(zipped(&[
            ("hello.txt", b"Hello\n"),
            ("sub/world.txt", b"World\n"),
        ]));
        data.set_uri("file:///tmp/box.zip");
        data.set_mime_type("application/zip");

        let mut children = Children::for_parent(&data);
        zip.decompose(&data, &mut children).await.unwrap();
        let out = children.into_inner();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].uri(), Some("file:///tmp/box/hello.txt"));
        assert_eq!(out[0].body().unwrap().as_ref(), b"Hello\n");
        assert_eq!(out[1].uri(), Some("file:///tmp/box/sub/world.txt"));
    }

    #[tokio::test]
    async fn test_decompose_encrypted_entry() {
        let zip = Zip::new();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .with_deprecated_encryption(b"secret");
        writer.start_file("hidden.txt", options).unwrap();
        writer.write_all(b"secret body").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut data = Data::from_bytes(bytes);
        data.set_uri("vault.zip");
        data.set_mime_type("application/zip");

        let mut children = Children::for_parent(&data);
        let result = zip.decompose(&data, &mut children).await;
        assert!(matches!(
            result,
            Err(DecomposeError::Encrypted { ref uri, .. }) if uri == "vault.zip"
        ));
    }

    #[tokio::test]
    async fn test_decompose_garbage_is_io_error() {
        let zip = Zip::new();
        let mut data = Data::from_bytes(b"this is not a zip file".to_vec());
        data.set_uri("fake.zip");

        let mut children = Children::for_parent(&data);
        let result = zip.decompose(&data, &mut children).await;
        assert!(matches!(result, Err(DecomposeError::Io(_))));
    }
}
