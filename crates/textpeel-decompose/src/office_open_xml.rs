//! Office Open XML decomposition for Word, PowerPoint, and Excel documents.
//!
//! An OOXML document is a zip container. Body text comes from the kind's main
//! parts (`word/document.xml`, the `ppt/slides/slideN.xml` series in slide
//! order, or `xl/sharedStrings.xml`), metadata from `docProps/core.xml` and
//! `docProps/app.xml`. Password-protected documents are OLE compound files
//! rather than zip containers and are rejected as encrypted.

use std::io::Cursor;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use textpeel_core::attributes::parse_time;
use textpeel_core::{Attributes, Children, Data, DecomposeError, Decomposer};
use tracing::warn;
use zip::ZipArchive;

use crate::opendocument::read_container_entry;
use crate::zip::map_zip_error;

/// Magic bytes of an OLE compound file, the envelope of encrypted OOXML.
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Document,
    Presentation,
    Workbook,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Document, Kind::Presentation, Kind::Workbook];

    #[must_use]
    pub fn decomposer_name(self) -> &'static str {
        match self {
            Kind::Document => "office-open-xml-document",
            Kind::Presentation => "office-open-xml-presentation",
            Kind::Workbook => "office-open-xml-workbook",
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            Kind::Document => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Kind::Presentation => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Kind::Workbook => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Kind::Document => "docx",
            Kind::Presentation => "pptx",
            Kind::Workbook => "xlsx",
        }
    }

    /// Element holding visible text in this kind's main parts.
    fn text_tag(self) -> &'static [u8] {
        match self {
            Kind::Document => b"w:t",
            Kind::Presentation => b"a:t",
            Kind::Workbook => b"t",
        }
    }

    /// Element whose end marks a line break.
    fn break_tag(self) -> &'static [u8] {
        match self {
            Kind::Document => b"w:p",
            Kind::Presentation => b"a:p",
            Kind::Workbook => b"si",
        }
    }
}

pub struct OfficeOpenXml {
    kind: Kind,
}

impl OfficeOpenXml {
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        Self { kind }
    }

    /// Main-part entry names for this kind, in reading order.
    fn main_parts(&self, container: &[u8], data: &Data) -> Result<Vec<String>, DecomposeError> {
        match self.kind {
            Kind::Document => Ok(vec!["word/document.xml".to_string()]),
            Kind::Workbook => Ok(vec!["xl/sharedStrings.xml".to_string()]),
            Kind::Presentation => {
                let archive = ZipArchive::new(Cursor::new(container))
                    .map_err(|e| map_zip_error(e, data))?;
                let mut slides: Vec<(u32, String)> = archive
                    .file_names()
                    .filter_map(|name| {
                        let number = name
                            .strip_prefix("ppt/slides/slide")?
                            .strip_suffix(".xml")?;
                        Some((number.parse().ok()?, name.to_string()))
                    })
                    .collect();
                slides.sort();
                Ok(slides.into_iter().map(|(_, name)| name).collect())
            }
        }
    }
}

/// Text of one main part: `text_tag` character data with a newline after each
/// `break_tag`.
fn extract_part_text(part: &[u8], kind: Kind, uri: &str, text: &mut String) {
    let mut reader = Reader::from_reader(part);
    let mut buffer = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(event)) => {
                in_text = event.name().as_ref() == kind.text_tag();
            }
            Ok(Event::End(event)) => {
                if event.name().as_ref() == kind.break_tag() {
                    text.push('\n');
                }
                in_text = false;
            }
            Ok(Event::Text(event)) if in_text => match event.unescape() {
                Ok(chunk) => text.push_str(&chunk),
                Err(error) => {
                    warn!(uri, %error, "undecodable OOXML text node");
                    break;
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => {
                warn!(uri, %error, "broken OOXML part");
                break;
            }
        }
        buffer.clear();
    }
}

/// Metadata of `docProps/core.xml` and `docProps/app.xml`.
fn extract_properties(core: Option<&[u8]>, app: Option<&[u8]>, uri: &str) -> Attributes {
    let mut attributes = Attributes::new();
    if let Some(core) = core {
        scan_properties(core, uri, &mut attributes, |name, value, attributes| {
            match name {
                b"dc:title" => attributes.set_title(value),
                b"dc:creator" => attributes.set_author(value),
                b"dc:description" => attributes.set("description", value.into()),
                b"dc:subject" => attributes.set("subject", value.into()),
                b"cp:keywords" => attributes.set("keywords", value.into()),
                b"dcterms:created" => {
                    if let Some(time) = parse_time(&value) {
                        attributes.set_created_time(time);
                    }
                }
                b"dcterms:modified" => {
                    if let Some(time) = parse_time(&value) {
                        attributes.set_modified_time(time);
                    }
                }
                _ => {}
            }
        });
    }
    if let Some(app) = app {
        scan_properties(app, uri, &mut attributes, |name, value, attributes| {
            if name == b"Application" {
                attributes.set("application", value.into());
            }
        });
    }
    attributes
}

fn scan_properties(
    part: &[u8],
    uri: &str,
    attributes: &mut Attributes,
    mut apply: impl FnMut(&[u8], String, &mut Attributes),
) {
    let mut reader = Reader::from_reader(part);
    let mut buffer = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(event)) => current = Some(event.name().as_ref().to_vec()),
            Ok(Event::End(_)) => current = None,
            Ok(Event::Text(event)) => {
                let Ok(value) = event.unescape() else { continue };
                if let Some(name) = current.as_deref() {
                    apply(name, value.into_owned(), attributes);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => {
                warn!(uri, %error, "broken OOXML properties");
                break;
            }
        }
        buffer.clear();
    }
}

#[async_trait]
impl Decomposer for OfficeOpenXml {
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
        let uri = data.uri_or_empty();
        if data.peek(OLE_MAGIC.len())? == OLE_MAGIC {
            return Err(DecomposeError::Encrypted {
                uri: uri.to_string(),
                mime_type: self.kind.mime_type().to_string(),
            });
        }

        let container = data.body()?;
        let mut text = String::new();
        for part_name in self.main_parts(&container, data)? {
            match read_container_entry(&container, &part_name, data)? {
                Some(part) => extract_part_text(&part, self.kind, uri, &mut text),
                None => warn!(uri, part = %part_name, "OOXML container is missing a part"),
            }
        }

        let core = read_container_entry(&container, "docProps/core.xml", data)?;
        let app = read_container_entry(&container, "docProps/app.xml", data)?;

        let mut child = Data::text(text);
        child.set_text_uri_from(uri);
        child.attributes = extract_properties(core.as_deref(), app.as_deref(), uri);
        children.push(child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::tests::zipped;
    use textpeel_core::AttributeValue;

    const CORE: &[u8] = b"<cp:coreProperties>\
        <dc:title>Quarterly Report</dc:title>\
        <dc:creator>Bob</dc:creator>\
        <cp:keywords>finance, q3</cp:keywords>\
        <dcterms:created>2020-01-02T03:04:05Z</dcterms:created>\
        <dcterms:modified>2020-02-03T04:05:06Z</dcterms:modified>\
        </cp:coreProperties>";

    const APP: &[u8] = b"<Properties><Application>LibreOffice</Application></Properties>";

    #[test]
    fn test_target_by_kind() {
        let document = OfficeOpenXml::new(Kind::Document);
        let workbook = OfficeOpenXml::new(Kind::Workbook);
        let mut data = Data::from_bytes(vec![]);
        data.set_uri("report.docx");
        assert_eq!(document.target_score(&data), Some(-1));
        assert_eq!(workbook.target_score(&data), None);
    }

    #[tokio::test]
    async fn test_decompose_document() {
        let decomposer = OfficeOpenXml::new(Kind::Document);
        let document_xml = b"<w:document><w:body>\
            <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t> World</w:t></w:r></w:p>\
            <w:p><w:r><w:t>Second</w:t></w:r></w:p>\
            </w:body></w:document>";
        let mut data = Data::from_bytes(zipped(&[
            ("word/document.xml", document_xml.as_slice()),
            ("docProps/core.xml", CORE),
            ("docProps/app.xml", APP),
        ]));
        data.set_uri("file:///tmp/report.docx");

        let mut children = Children::for_parent(&data);
        decomposer.decompose(&data, &mut children).await.unwrap();
        let out = children.into_inner();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].uri(), Some("file:///tmp/report.txt"));
        assert_eq!(out[0].body().unwrap().as_ref(), b"Hello World\nSecond\n");
        assert_eq!(out[0].attributes.title(), Some("Quarterly Report"));
        assert_eq!(out[0].attributes.author(), Some("Bob"));
        assert_eq!(
            out[0].attributes.get("application"),
            Some(AttributeValue::from("LibreOffice"))
        );
        assert_eq!(
            out[0].attributes.modified_time().unwrap().to_rfc3339(),
            "2020-02-03T04:05:06+00:00"
        );
    }

    #[tokio::test]
    async fn test_decompose_presentation_orders_slides_numerically() {
        let decomposer = OfficeOpenXml::new(Kind::Presentation);
        let slide = |text: &str| {
            format!("<p:sld><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sld>")
        };
        let slide1 = slide("one");
        let slide2 = slide("two");
        let slide10 = slide("ten");
        // Archive order is shuffled; slide10 must still sort after slide2.
        let mut data = Data::from_bytes(zipped(&[
            ("ppt/slides/slide10.xml", slide10.as_bytes()),
            ("ppt/slides/slide1.xml", slide1.as_bytes()),
            ("ppt/slides/slide2.xml", slide2.as_bytes()),
        ]));
        data.set_uri("deck.pptx");

        let mut children = Children::for_parent(&data);
        decomposer.decompose(&data, &mut children).await.unwrap();
        let out = children.into_inner();
        assert_eq!(out[0].body().unwrap().as_ref(), b"one\ntwo\nten\n");
    }

    #[tokio::test]
    async fn test_decompose_workbook_shared_strings() {
        let decomposer = OfficeOpenXml::new(Kind::Workbook);
        let shared = b"<sst><si><t>alpha</t></si><si><t>beta</t></si></sst>";
        let mut data = Data::from_bytes(zipped(&[(
            "xl/sharedStrings.xml",
            shared.as_slice(),
        )]));
        data.set_uri("numbers.xlsx");

        let mut children = Children::for_parent(&data);
        decomposer.decompose(&data, &mut children).await.unwrap();
        let out = children.into_inner();
        assert_eq!(out[0].body().unwrap().as_ref(), b"alpha\nbeta\n");
    }

    #[tokio::test]
    async fn test_decompose_ole_envelope_is_encrypted() {
        let decomposer = OfficeOpenXml::new(Kind::Document);
        let mut bytes = OLE_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        let mut data = Data::from_bytes(bytes);
        data.set_uri("locked.docx");

        let mut children = Children::for_parent(&data);
        let result = decomposer.decompose(&data, &mut children).await;
        assert!(matches!(
            result,
            Err(DecomposeError::Encrypted { ref uri, .. }) if uri == "locked.docx"
        ));
    }
}
