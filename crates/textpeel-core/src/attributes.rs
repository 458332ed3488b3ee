//! Metadata attributes attached to a [`Data`](crate::Data) node.
//!
//! A fixed record of well-known optional fields plus an ordered open-ended
//! map for extras. A unified accessor checks the fixed fields first. Iteration
//! yields the fixed fields in declaration order, then extras in insertion
//! order, so output is deterministic.

use chrono::{DateTime, TimeZone, Utc};
use encoding_rs::Encoding;
use serde::Serialize;
use tracing::warn;

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Strings(Vec<String>),
    Integer(i64),
    Time(DateTime<Utc>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::Strings(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

/// Well-known fields plus ordered extras.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    title: Option<String>,
    author: Option<String>,
    encoding: Option<&'static Encoding>,
    created_time: Option<DateTime<Utc>>,
    modified_time: Option<DateTime<Utc>>,
    extras: Vec<(String, AttributeValue)>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = Some(author.into());
    }

    #[must_use]
    pub fn encoding(&self) -> Option<&'static Encoding> {
        self.encoding
    }

    /// Coerces an encoding label (`"UTF-8"`, `"Shift_JIS"`, ...) into the
    /// underlying encoding. Unknown labels are logged and ignored.
    pub fn set_encoding(&mut self, label: &str) {
        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) => self.encoding = Some(encoding),
            None => warn!(label, "ignoring unknown encoding label"),
        }
    }

    #[must_use]
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_time
    }

    pub fn set_created_time(&mut self, time: DateTime<Utc>) {
        self.created_time = Some(time);
    }

    #[must_use]
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        self.modified_time
    }

    pub fn set_modified_time(&mut self, time: DateTime<Utc>) {
        self.modified_time = Some(time);
    }

    /// Unified lookup: fixed fields first, then extras.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "title" => self.title.clone().map(AttributeValue::String),
            "author" => self.author.clone().map(AttributeValue::String),
            "encoding" => self
                .encoding
                .map(|e| AttributeValue::String(e.name().to_string())),
            "created_time" => self.created_time.map(AttributeValue::Time),
            "modified_time" => self.modified_time.map(AttributeValue::Time),
            _ => self
                .extras
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
        }
    }

    /// Unified store. Well-known names are routed to the fixed fields with
    /// coercion (encoding labels, string/integer timestamps); everything else
    /// lands in the extras map, preserving first-insertion position.
    pub fn set(&mut self, name: &str, value: AttributeValue) {
        match name {
            "title" => {
                if let AttributeValue::String(s) = value {
                    self.title = Some(s);
                }
            }
            "author" => {
                if let AttributeValue::String(s) = value {
                    self.author = Some(s);
                }
            }
            "encoding" => {
                if let AttributeValue::String(label) = value {
                    self.set_encoding(&label);
                }
            }
            "created_time" => self.created_time = coerce_time(value),
            "modified_time" => self.modified_time = coerce_time(value),
            _ => {
                if let Some(slot) = self.extras.iter_mut().find(|(key, _)| key == name) {
                    slot.1 = value;
                } else {
                    self.extras.push((name.to_string(), value));
                }
            }
        }
    }

    /// All set attributes: fixed fields in declaration order, then extras in
    /// insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, AttributeValue)> {
        let fixed = [
            ("title", self.title.clone().map(AttributeValue::String)),
            ("author", self.author.clone().map(AttributeValue::String)),
            (
                "encoding",
                self.encoding
                    .map(|e| AttributeValue::String(e.name().to_string())),
            ),
            ("created_time", self.created_time.map(AttributeValue::Time)),
            (
                "modified_time",
                self.modified_time.map(AttributeValue::Time),
            ),
        ];
        fixed
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .chain(
                self.extras
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.clone())),
            )
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.encoding.is_none()
            && self.created_time.is_none()
            && self.modified_time.is_none()
            && self.extras.is_empty()
    }
}

fn coerce_time(value: AttributeValue) -> Option<DateTime<Utc>> {
    match value {
        AttributeValue::Time(time) => Some(time),
        AttributeValue::Integer(unix) => Utc.timestamp_opt(unix, 0).single(),
        AttributeValue::String(text) => parse_time(&text),
        AttributeValue::Strings(_) => None,
    }
}

/// Parse an RFC 3339 / W3C-DTF timestamp string.
#[must_use]
pub fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
