//! OpenDocument (ODF) decomposition for text, presentation, and spreadsheet
//! documents.
//!
//! An ODF document is a zip container. Body text comes from `content.xml`
//! (paragraph-aware), metadata from `meta.xml`. Password-protected documents
//! declare `encryption-data` in the manifest and are rejected as encrypted.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use textpeel_core::attributes::parse_time;
use textpeel_core::{AttributeValue, Attributes, Children, Data, DecomposeError, Decomposer};
use tracing::warn;
use zip::ZipArchive;

use crate::zip::map_zip_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text,
    Presentation,
    Spreadsheet,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Text, Kind::Presentation, Kind::Spreadsheet];

    #[must_use]
    pub fn decomposer_name(self) -> &'static str {
        match self {
            Kind::Text => "opendocument-text",
            Kind::Presentation => "opendocument-presentation",
            Kind::Spreadsheet => "opendocument-spreadsheet",
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            Kind::Text => "application/vnd.oasis.opendocument.text",
            Kind::Presentation => "application/vnd.oasis.opendocument.presentation",
            Kind::Spreadsheet => "application/vnd.oasis.opendocument.spreadsheet",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Kind::Text => "odt",
            Kind::Presentation => "odp",
            Kind::Spreadsheet => "ods",
        }
    }
}

pub struct OpenDocument {
    kind: Kind,
}

impl OpenDocument {
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        Self { kind }
    }
}

/// Read one named entry out of a zip container, or `None` if absent.
pub(crate) fn read_container_entry(
    container: &[u8],
    name: &str,
    data: &Data,
) -> Result<Option<Vec<u8>>, DecomposeError> {
    let mut archive =
        ZipArchive::new(Cursor::new(container)).map_err(|e| map_zip_error(e, data))?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(error) => return Err(map_zip_error(error, data)),
    };
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// Body text of `content.xml`: character data with a newline after each
/// paragraph or heading.
fn extract_content_text(content: &[u8], uri: &str) -> String {
    let mut reader = Reader::from_reader(content);
    let mut buffer = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Text(event)) => match event.unescape() {
                Ok(chunk) => text.push_str(&chunk),
                Err(error) => {
                    warn!(uri, %error, "undecodable ODF text node");
                    break;
                }
            },
            Ok(Event::End(event))
                if matches!(event.name().as_ref(), b"text:p" | b"text:h") =>
            {
                text.push('\n');
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => {
                warn!(uri, %error, "broken ODF content");
                break;
            }
        }
        buffer.clear();
    }
    text
}

/// Metadata of `meta.xml`.
fn extract_meta_attributes(meta: &[u8], uri: &str) -> Attributes {
    let mut reader = Reader::from_reader(meta);
    let mut buffer = Vec::new();
    let mut attributes = Attributes::new();
    let mut keywords: Vec<String> = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(event)) => current = Some(event.name().as_ref().to_vec()),
            Ok(Event::End(_)) => current = None,
            Ok(Event::Text(event)) => {
                let Ok(value) = event.unescape() else { continue };
                let value = value.into_owned();
                match current.as_deref() {
                    Some(b"dc:title") => attributes.set_title(value),
                    Some(b"dc:creator") => attributes.set_author(value),
                    Some(b"dc:description") => attributes.set("description", value.into()),
                    Some(b"dc:subject") => attributes.set("subject", value.into()),
                    Some(b"meta:generator") => attributes.set("generator", value.into()),
                    Some(b"meta:keyword") => keywords.push(value),
                    Some(b"meta:creation-date") => {
                        if let Some(time) = parse_time(&value) {
                            attributes.set_created_time(time);
                        }
                    }
                    Some(b"dc:date") => {
                        if let Some(time) = parse_time(&value) {
                            attributes.set_modified_time(time);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => {
                warn!(uri, %error, "broken ODF metadata");
                break;
            }
        }
        buffer.clear();
    }
    if !keywords.is_empty() {
        attributes.set("keywords", AttributeValue::Strings(keywords));
    }
    attributes
}

#[async_trait]
impl Decomposer for OpenDocument {
    fn name(&self) -> &str {
        self.kind.decomposer_name()
    }

    fn target_score(&self, data: &Data) -> Option<i32> {
        let by_mime = data.mime_type() == Some(self.kind.mime_type());
        let by_extension = data.extension().as_deref() == Some(self.kind.extension());
        (by_mime || by_extension).then_some(-1)
    }

    async fn decompose(
        &self,
        data: &Data,
        children: &mut Children,
    ) -> Result<(), DecomposeError> {
        let container = data.body()?;
        let uri = data.uri_or_empty();

        if let Some(manifest) = read_container_entry(&container, "META-INF/manifest.xml", data)? {
            if manifest
                .windows(b"encryption-data".len())
                .any(|window| window == b"encryption-data")
            {
                return Err(DecomposeError::Encrypted {
                    uri: uri.to_string(),
                    mime_type: self.kind.mime_type().to_string(),
                });
            }
        }

        let text = match read_container_entry(&container, "content.xml", data)? {
            Some(content) => extract_content_text(&content, uri),
            None => {
                warn!(uri, "ODF container has no content.xml");
                String::new()
            }
        };

        let mut child = Data::text(text);
        child.set_text_uri_from(uri);
        if let Some(meta) = read_container_entry(&container, "meta.xml", data)? {
            child.attributes = extract_meta_attributes(&meta, uri);
        }
        children.push(child);
        Ok(())
    }
}
