//! XML decomposition: concatenated character data becomes one text child.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use textpeel_core::{Children, Data, DecomposeError, Decomposer};
use tracing::warn;

const MIME_TYPES: &[&str] = &["text/xml", "application/xml"];

pub struct Xml;

impl Xml {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Xml {
    fn default() -> Self {
        Self::new()
    }
}

/// Character data of the document, in document order. A malformed document
/// yields the text collected up to the error.
pub(crate) fn extract_text(bytes: &[u8], uri: &str) -> String {
    let mut reader = Reader::from_reader(bytes);
    let mut buffer = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Text(event)) => match event.unescape() {
                Ok(chunk) => text.push_str(&chunk),
                Err(error) => {
                    warn!(uri, %error, "undecodable XML text node");
                    break;
                }
            },
            Ok(Event::CData(event)) => {
                text.push_str(&String::from_utf8_lossy(&event));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => {
                warn!(uri, %error, "broken XML document");
                break;
            }
        }
        buffer.clear();
    }
    text
}

#[async_trait]
impl Decomposer for Xml {
    fn name(&self) -> &str {
        "xml"
    }

    fn target_score(&self, data: &Data) -> Option<i32> {
        if data.is_text_plain() {
            return None;
        }
        let by_mime = data
            .mime_type()
            .is_some_and(|mime| MIME_TYPES.contains(&mime));
        let by_extension = data.extension().as_deref() == Some("xml");
        (by_mime || by_extension).then_some(-1)
    }

    async fn decompose(
        &self,
        data: &Data,
        children: &mut Children,
    ) -> Result<(), DecomposeError> {
        let body = data.body()?;
        let mut child = Data::text(extract_text(&body, data.uri_or_empty()));
        child.set_text_uri_from(data.uri_or_empty());
        children.push(child);
        Ok(())
    }
}
