//! Delegation to an external extraction HTTP server.
//!
//! A catch-all handler: it bids a high score so it only runs when no
//! structural decomposer claimed the node, and posts the raw bytes to a
//! remote extraction endpoint. Delegate failures are recoverable: the node
//! simply yields no text.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use textpeel_core::{AttributeValue, Children, Data, DecomposeError, Decomposer};
use tracing::{debug, warn};

use crate::registry::{Options, RegistryError};

/// Runs after every structural decomposer declined.
const DELEGATE_SCORE: i32 = 100;

pub struct HttpServer {
    url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    texts: Vec<ExtractedText>,
}

#[derive(Deserialize)]
struct ExtractedText {
    uri: Option<String>,
    body: Option<String>,
    #[serde(flatten)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl HttpServer {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build from configuration. Without a `url` option the delegate is not
    /// usable and is skipped.
    pub fn from_options(
        options: &Options,
    ) -> Result<Option<Arc<dyn Decomposer>>, RegistryError> {
        let mut url = None;
        for (option, value) in options {
            match option.as_str() {
                "url" => match value.as_str() {
                    Some(value) => url = Some(value.to_string()),
                    None => {
                        return Err(RegistryError::InvalidOption {
                            decomposer: "http-server".to_string(),
                            option: option.clone(),
                            detail: "expected a string".to_string(),
                        })
                    }
                },
                _ => {
                    return Err(RegistryError::UnknownOption {
                        decomposer: "http-server".to_string(),
                        option: option.clone(),
                    })
                }
            }
        }
        Ok(url.map(|url| Arc::new(Self::new(url)) as Arc<dyn Decomposer>))
    }

    fn apply_response(response: Response, children: &mut Children) {
        for extracted in response.texts {
            let mut child = Data::text(extracted.body.unwrap_or_default());
            if let Some(uri) = extracted.uri {
                child.set_uri(uri);
            }
            for (name, value) in extracted.attributes {
                // Structural response fields, not document metadata.
                if name == "mime-type" || name == "size" {
                    continue;
                }
                if let Some(value) = attribute_value(value) {
                    child.attributes.set(&name, value);
                }
            }
            children.push(child);
        }
    }
}

fn attribute_value(value: serde_json::Value) -> Option<AttributeValue> {
    match value {
        serde_json::Value::String(s) => Some(AttributeValue::String(s)),
        serde_json::Value::Number(n) => n.as_i64().map(AttributeValue::Integer),
        serde_json::Value::Array(items) => Some(AttributeValue::Strings(
            items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        )),
        _ => None,
    }
}

#[async_trait]
impl Decomposer for HttpServer {
    fn name(&self) -> &str {
        "http-server"
    }

    fn target_score(&self, data: &Data) -> Option<i32> {
        if data.is_text_plain() {
            return None;
        }
        Some(DELEGATE_SCORE)
    }

    async fn decompose(
        &self,
        data: &Data,
        children: &mut Children,
    ) -> Result<(), DecomposeError> {
        let uri = data.uri_or_empty().to_string();
        let mut part = reqwest::multipart::Part::bytes(data.body()?.into_owned())
            .file_name(uri.clone());
        if let Some(mime_type) = data.mime_type() {
            match part.mime_str(mime_type) {
                Ok(with_mime) => part = with_mime,
                Err(error) => {
                    warn!(uri = %uri, mime_type, %error, "unusable MIME type for delegate");
                    part = reqwest::multipart::Part::bytes(data.body()?.into_owned())
                        .file_name(uri.clone());
                }
            }
        }

        let mut form = reqwest::multipart::Form::new().part("data", part);
        if let Some(seconds) = data.timeout.raw() {
            form = form.text("timeout", format!("{seconds}"));
        }
        if let Some(max_body_size) = data.max_body_size {
            form = form.text("max_body_size", max_body_size.to_string());
        }

        let response = match self.client.post(&self.url).multipart(form).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(uri = %uri, url = %self.url, %error, "extraction delegate unreachable");
                return Ok(());
            }
        };
        if !response.status().is_success() {
            warn!(
                uri = %uri,
                url = %self.url,
                status = %response.status(),
                "extraction delegate rejected the request"
            );
            return Ok(());
        }
        match response.json::<Response>().await {
            Ok(parsed) => {
                debug!(uri = %uri, texts = parsed.texts.len(), "delegate extraction succeeded");
                Self::apply_response(parsed, children);
            }
            Err(error) => {
                warn!(uri = %uri, url = %self.url, %error, "unparsable delegate response");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_options_without_url_skips() {
        let built = HttpServer::from_options(&Options::new()).unwrap();
        assert!(built.is_none());
    }

    #[test]
    fn test_from_options_with_url() {
        let mut options = Options::new();
        options.insert("url".to_string(), serde_json::json!("http://localhost:8000"));
        let built = HttpServer::from_options(&options).unwrap();
        assert_eq!(built.unwrap().name(), "http-server");
    }

    #[test]
    fn test_from_options_rejects_non_string_url() {
        let mut options = Options::new();
        options.insert("url".to_string(), serde_json::json!(42));
        let err = HttpServer::from_options(&options).err().unwrap();
        assert!(matches!(err, RegistryError::InvalidOption { .. }));
    }

    #[test]
    fn test_score_is_last_resort() {
        let delegate = HttpServer::new("http://localhost:8000");
        let mut data = Data::from_bytes(vec![]);
        data.set_mime_type("application/pdf");
        assert_eq!(delegate.target_score(&data), Some(DELEGATE_SCORE));
        data.set_mime_type("text/plain");
        assert_eq!(delegate.target_score(&data), None);
    }

    #[test]
    fn test_apply_response() {
        let parent = {
            let mut data = Data::from_bytes(vec![]);
            data.set_uri("scan.pdf");
            data
        };
        let response: Response = serde_json::from_value(serde_json::json!({
            "mime-type": "application/pdf",
            "texts": [
                {"uri": "scan.txt", "body": "Page one", "title": "Scan", "page": 1}
            ]
        }))
        .unwrap();

        let mut children = Children::for_parent(&parent);
        HttpServer::apply_response(response, &mut children);
        let out = children.into_inner();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].uri(), Some("scan.txt"));
        assert_eq!(out[0].body().unwrap().as_ref(), b"Page one");
        assert_eq!(out[0].attributes.title(), Some("Scan"));
        assert_eq!(
            out[0].attributes.get("page"),
            Some(AttributeValue::Integer(1))
        );
    }
}
