//! Output formatters for extraction results.
//!
//! A formatter observes the run: once at the start with the root input, once
//! per extracted text leaf, and once at the end to render the accumulated
//! output.

use serde_json::{json, Map, Value};
use textpeel_core::Data;
use tracing::warn;

pub trait Formatter: Send {
    /// Called once with the root input before extraction starts.
    fn format_start(&mut self, data: &Data);

    /// Called for each extracted text leaf, in extraction order.
    fn format_extracted(&mut self, data: &Data);

    /// Called once after extraction; renders the final output.
    fn format_finish(&mut self, data: &Data) -> String;
}

/// Structured output: root metadata plus one object per text leaf under
/// `"texts"`.
#[derive(Default)]
pub struct JsonFormatter {
    texts: Vec<Value>,
}

impl JsonFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn describe(data: &Data, include_path: bool) -> Map<String, Value> {
        let mut object = Map::new();
        if let Some(mime_type) = data.mime_type() {
            object.insert("mime-type".to_string(), json!(mime_type));
        }
        if let Some(uri) = data.uri() {
            object.insert("uri".to_string(), json!(uri));
        }
        if include_path {
            if let Some(path) = data.path() {
                object.insert("path".to_string(), json!(path.to_string_lossy()));
            }
        }
        object.insert("size".to_string(), json!(data.size()));
        for (name, value) in data.attributes.iter() {
            match serde_json::to_value(&value) {
                Ok(value) => {
                    object.insert(name.to_string(), value);
                }
                Err(error) => warn!(name, %error, "unserializable attribute"),
            }
        }
        object
    }

    /// MIME types of the ancestor chain, nearest parent first.
    fn source_mime_types(data: &Data) -> Vec<String> {
        let mut mime_types = Vec::new();
        let mut current = data.source().map(|lineage| lineage.as_ref());
        while let Some(node) = current {
            if let Some(mime_type) = &node.mime_type {
                mime_types.push(mime_type.clone());
            }
            current = node.parent.as_deref();
        }
        mime_types
    }
}

impl Formatter for JsonFormatter {
    fn format_start(&mut self, _data: &Data) {}

    fn format_extracted(&mut self, data: &Data) {
        let mut object = Self::describe(data, false);
        let source_mime_types = Self::source_mime_types(data);
        if !source_mime_types.is_empty() {
            object.insert("source-mime-types".to_string(), json!(source_mime_types));
        }
        let body = match data.body() {
            Ok(body) => String::from_utf8_lossy(&body).into_owned(),
            Err(error) => {
                warn!(uri = data.uri_or_empty(), %error, "unreadable leaf body");
                String::new()
            }
        };
        object.insert("body".to_string(), json!(body));
        self.texts.push(Value::Object(object));
    }

    fn format_finish(&mut self, data: &Data) -> String {
        let mut root = Self::describe(data, true);
        root.insert("texts".to_string(), Value::Array(std::mem::take(&mut self.texts)));
        // Map serialization cannot fail.
        serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_default()
    }
}

/// Plain output: leaf bodies joined by newlines.
#[derive(Default)]
pub struct TextFormatter {
    bodies: Vec<String>,
}

impl TextFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Formatter for TextFormatter {
    fn format_start(&mut self, _data: &Data) {}

    fn format_extracted(&mut self, data: &Data) {
        match data.body() {
            Ok(body) => self
                .bodies
                .push(String::from_utf8_lossy(&body).into_owned()),
            Err(error) => {
                warn!(uri = data.uri_or_empty(), %error, "unreadable leaf body");
            }
        }
    }

    fn format_finish(&mut self, _data: &Data) -> String {
        self.bodies.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(uri: &str, body: &str) -> Data {
        let mut data = Data::text(body);
        data.set_uri(uri);
        data
    }

    #[test]
    fn test_json_formatter_shape() {
        let mut root = Data::from_bytes(vec![1, 2, 3]);
        root.set_uri("box.zip");
        root.set_mime_type("application/zip");

        let mut formatter = JsonFormatter::new();
        formatter.format_start(&root);

        let mut first = leaf("box/a.txt", "alpha");
        first.attributes.set_title("Alpha");
        formatter.format_extracted(&first);
        formatter.format_extracted(&leaf("box/b.txt", "beta"));

        let output = formatter.format_finish(&root);
        let parsed: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["mime-type"], "application/zip");
        assert_eq!(parsed["uri"], "box.zip");
        assert_eq!(parsed["size"], 3);
        let texts = parsed["texts"].as_array().unwrap();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0]["uri"], "box/a.txt");
        assert_eq!(texts[0]["mime-type"], "text/plain");
        assert_eq!(texts[0]["body"], "alpha");
        assert_eq!(texts[0]["title"], "Alpha");
        assert_eq!(texts[1]["body"], "beta");
    }

    #[test]
    fn test_json_formatter_serializes_time_attributes() {
        let mut data = leaf("a.txt", "x");
        data.attributes
            .set("created_time", "2019-02-19T00:30:05Z".into());

        let mut formatter = JsonFormatter::new();
        formatter.format_extracted(&data);
        let output = formatter.format_finish(&data);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert!(parsed["texts"][0]["created_time"]
            .as_str()
            .unwrap()
            .starts_with("2019-02-19"));
    }

    #[test]
    fn test_json_formatter_source_mime_types() {
        let mut parent = Data::from_bytes(vec![]);
        parent.set_uri("box.zip");
        parent.set_mime_type("application/zip");
        let mut children = textpeel_core::Children::for_parent(&parent);
        children.push(leaf("box/a.txt", "alpha"));
        let child = children.into_inner().pop().unwrap();

        let mut formatter = JsonFormatter::new();
        formatter.format_extracted(&child);
        let output = formatter.format_finish(&parent);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            parsed["texts"][0]["source-mime-types"],
            serde_json::json!(["application/zip"])
        );
    }

    #[test]
    fn test_text_formatter_joins_bodies() {
        let root = leaf("in.txt", "ignored");
        let mut formatter = TextFormatter::new();
        formatter.format_start(&root);
        formatter.format_extracted(&leaf("a.txt", "one"));
        formatter.format_extracted(&leaf("b.txt", "two"));
        assert_eq!(formatter.format_finish(&root), "one\ntwo");
    }

    #[test]
    fn test_text_formatter_empty_run() {
        let root = leaf("in.bin", "");
        let mut formatter = TextFormatter::new();
        formatter.format_start(&root);
        assert_eq!(formatter.format_finish(&root), "");
    }
}
