//! Extension-based MIME registry with magic-byte sniffing.
//!
//! Explicitly assigned MIME types always win; the registry only fills gaps.
//! It is plain owned state passed to the extractor, not a process global.

use std::collections::HashMap;

/// Maps normalized file extensions to MIME types and sniffs unknown content.
#[derive(Debug, Clone, Default)]
pub struct MimeRegistry {
    from_extension: HashMap<String, String>,
}

impl MimeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the formats the built-in decomposers handle
    /// plus common text types.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (extension, mime_type) in [
            ("txt", "text/plain"),
            ("md", "text/markdown"),
            ("csv", "text/csv"),
            ("xml", "text/xml"),
            ("html", "text/html"),
            ("htm", "text/html"),
            ("json", "application/json"),
            ("gz", "application/gzip"),
            ("tgz", "application/x-gtar-compressed"),
            ("tar", "application/x-tar"),
            ("zip", "application/zip"),
            ("odt", "application/vnd.oasis.opendocument.text"),
            ("odp", "application/vnd.oasis.opendocument.presentation"),
            ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
            (
                "docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ),
            (
                "pptx",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            ),
            (
                "xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
        ] {
            registry.register(extension, mime_type);
        }
        registry
    }

    /// Register an extension. A leading dot and letter case are normalized
    /// away, so `".TXT"` and `"txt"` are the same key.
    pub fn register(&mut self, extension: &str, mime_type: &str) {
        self.from_extension
            .insert(normalize_extension(extension), mime_type.to_string());
    }

    #[must_use]
    pub fn find(&self, extension: &str) -> Option<&str> {
        self.from_extension
            .get(&normalize_extension(extension))
            .map(String::as_str)
    }

    /// Magic-byte detection on a content prefix.
    #[must_use]
    pub fn sniff(&self, head: &[u8]) -> Option<String> {
        infer::get(head).map(|kind| kind.mime_type().to_string())
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_find() {
        let mut registry = MimeRegistry::new();
        registry.register("pdf", "application/pdf");
        assert_eq!(registry.find("pdf"), Some("application/pdf"));
    }

    #[test]
    fn test_find_normalizes_dot_and_case() {
        let registry = MimeRegistry::with_defaults();
        assert_eq!(registry.find(".TXT"), Some("text/plain"));
        assert_eq!(registry.find("Zip"), Some("application/zip"));
    }

    #[test]
    fn test_find_unknown() {
        let registry = MimeRegistry::with_defaults();
        assert_eq!(registry.find("xyz"), None);
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = MimeRegistry::new();
        registry.register("dat", "application/octet-stream");
        registry.register("dat", "application/x-custom");
        assert_eq!(registry.find("dat"), Some("application/x-custom"));
    }

    #[test]
    fn test_sniff_gzip_magic() {
        let registry = MimeRegistry::new();
        assert_eq!(
            registry.sniff(&[0x1F, 0x8B, 0x08, 0x00]),
            Some("application/gzip".to_string())
        );
    }

    #[test]
    fn test_sniff_plain_text_is_unknown() {
        let registry = MimeRegistry::new();
        assert_eq!(registry.sniff(b"just some text"), None);
    }
}
