//! Child URI derivation for container entries.
//!
//! A tar/zip entry name arrives as raw bytes in an unknown encoding. It is
//! repaired to UTF-8, percent-encoded per path segment (so `/` separators
//! stay hierarchy), and appended to the parent URI with its archive extension
//! stripped: `archive.zip` + `hello/world.txt` →
//! `archive/hello/world.txt`.

use encoding_rs::{EUC_JP, SHIFT_JIS};

/// Reinterpret raw path bytes as UTF-8: try UTF-8, EUC-JP, then Shift_JIS;
/// accept the first that validates, else transcode lossily (never fails).
#[must_use]
pub fn repair_entry_path(bytes: &[u8]) -> String {
    if bytes.is_ascii() {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    for candidate in [EUC_JP, SHIFT_JIS] {
        let (decoded, had_errors) = candidate.decode_without_bom_handling(bytes);
        if !had_errors {
            return decoded.into_owned();
        }
    }
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| *c != '\u{FFFD}')
        .collect()
}

/// Percent-encode each path segment independently, preserving `/`.
#[must_use]
pub fn escape_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Strip the extension-bearing suffix from the last segment of a URI.
#[must_use]
pub fn strip_extension(uri: &str) -> &str {
    let last_segment_start = uri.rfind('/').map_or(0, |i| i + 1);
    match uri[last_segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &uri[..last_segment_start + dot],
        _ => uri,
    }
}

/// Replace the extension of a URI's last segment with `.txt`.
#[must_use]
pub fn text_uri(uri: &str) -> String {
    format!("{}.txt", strip_extension(uri))
}

/// Derive a child URI from a parent URI and a raw container entry path.
#[must_use]
pub fn child_uri(parent_uri: &str, entry_path: &[u8]) -> String {
    let repaired = repair_entry_path(entry_path);
    format!(
        "{}/{}",
        strip_extension(parent_uri),
        escape_path(&repaired)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_ascii() {
        assert_eq!(repair_entry_path(b"docs/readme.txt"), "docs/readme.txt");
    }

    #[test]
    fn test_repair_utf8() {
        assert_eq!(repair_entry_path("日本語.txt".as_bytes()), "日本語.txt");
    }

    #[test]
    fn test_repair_eucjp() {
        // "あ.txt" in EUC-JP
        let mut bytes = vec![0xA4, 0xA2];
        bytes.extend_from_slice(b".txt");
        assert_eq!(repair_entry_path(&bytes), "あ.txt");
    }

    #[test]
    fn test_repair_unrecoverable_never_fails() {
        let bytes = [0x80, b'a', 0xFF, 0xFF, 0xFE, 0xA0];
        let repaired = repair_entry_path(&bytes);
        assert!(repaired.contains('a'));
        assert!(!repaired.contains('\u{FFFD}'));
    }

    #[test]
    fn test_escape_preserves_separators() {
        assert_eq!(escape_path("a b/c#d"), "a%20b/c%23d");
    }

    #[test]
    fn test_escape_non_ascii() {
        assert_eq!(escape_path("日"), "%E6%97%A5");
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("file:///tmp/archive.zip"), "file:///tmp/archive");
        assert_eq!(strip_extension("archive.tar"), "archive");
        assert_eq!(strip_extension("no-extension"), "no-extension");
        assert_eq!(strip_extension("dir.d/no-extension"), "dir.d/no-extension");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn test_text_uri() {
        assert_eq!(text_uri("report.docx"), "report.txt");
        assert_eq!(text_uri("plain"), "plain.txt");
    }

    #[test]
    fn test_child_uri() {
        assert_eq!(
            child_uri("file:///tmp/archive.zip", b"hello/world.txt"),
            "file:///tmp/archive/hello/world.txt"
        );
    }

    #[test]
    fn test_child_uri_escapes_entry() {
        assert_eq!(
            child_uri("box.zip", b"a b.txt"),
            "box/a%20b.txt"
        );
    }
}
