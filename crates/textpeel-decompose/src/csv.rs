//! CSV decomposition: each record becomes one line of space-joined cells.

use async_trait::async_trait;
use textpeel_core::{Children, Data, DecomposeError, Decomposer};
use tracing::warn;

pub struct Csv;

impl Csv {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Csv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Decomposer for Csv {
    fn name(&self) -> &str {
        "csv"
    }

    fn target_score(&self, data: &Data) -> Option<i32> {
        // The derived text child keeps a .csv-adjacent URI; matching it again
        // would recurse forever.
        if data.is_text_plain() {
            return None;
        }
        let by_mime = data.mime_type() == Some("text/csv");
        let by_extension = data.extension().as_deref() == Some("csv");
        (by_mime || by_extension).then_some(-1)
    }

    async fn decompose(
        &self,
        data: &Data,
        children: &mut Children,
    ) -> Result<(), DecomposeError> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.open()?);

        let mut text = String::new();
        for record in reader.records() {
            match record {
                Ok(record) => {
                    let mut first = true;
                    for cell in record.iter() {
                        if !first {
                            text.push(' ');
                        }
                        text.push_str(cell);
                        first = false;
                    }
                    text.push('\n');
                }
                Err(error) => {
                    // Malformed rows end the parse; what was read still counts.
                    warn!(uri = data.uri_or_empty(), %error, "broken CSV record");
                    break;
                }
            }
        }

        let mut child = Data::text(text);
        child.set_text_uri_from(data.uri_or_empty());
        children.push(child);
        Ok(())
    }
}
