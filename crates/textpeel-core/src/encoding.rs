//! Byte-to-UTF-8 normalization.
//!
//! Converts arbitrary byte content into valid, BOM-stripped UTF-8, using the
//! declared encoding when one is known and falling back to a guess chain
//! (UTF-8, EUC-JP, Shift_JIS) for untagged content. The conversion is total:
//! worst case it returns a degraded but valid UTF-8 string.

use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS, UTF_16BE, UTF_16LE};

const UTF_32BE_BOM: &[u8] = &[0x00, 0x00, 0xFE, 0xFF];
const UTF_32LE_BOM: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];
const UTF_8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF_16BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF_16LE_BOM: &[u8] = &[0xFF, 0xFE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bom {
    Utf8,
    Utf16Be,
    Utf16Le,
    Utf32Be,
    Utf32Le,
}

/// Normalize `bytes` to valid UTF-8.
///
/// `declared` is the encoding label attached to the content, if any (`None`
/// means binary/unspecified). `max_size` truncates the result to at most that
/// many bytes, never splitting a multi-byte sequence.
#[must_use]
pub fn normalize_utf8(bytes: &[u8], declared: Option<&str>, max_size: Option<usize>) -> String {
    let text = decode(bytes, declared);
    match max_size {
        Some(max) => truncate_to_char_boundary(text, max),
        None => text,
    }
}

fn decode(bytes: &[u8], declared: Option<&str>) -> String {
    if let Some((bom, len)) = detect_bom(bytes) {
        return decode_after_bom(bom, &bytes[len..]);
    }

    let declared = declared.and_then(lookup_label);
    match declared {
        Some(DeclaredEncoding::Utf8) => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => lossy_utf8(bytes),
        },
        Some(DeclaredEncoding::Known(encoding)) => decode_dropping_invalid(encoding, bytes),
        Some(DeclaredEncoding::Binary) | None => {
            if bytes.is_ascii() {
                // Trivially valid UTF-8.
                return String::from_utf8_lossy(bytes).into_owned();
            }
            guess_and_decode(bytes)
        }
    }
}

enum DeclaredEncoding {
    Utf8,
    Binary,
    Known(&'static Encoding),
}

fn lookup_label(label: &str) -> Option<DeclaredEncoding> {
    if label.eq_ignore_ascii_case("binary") || label.eq_ignore_ascii_case("ascii-8bit") {
        return Some(DeclaredEncoding::Binary);
    }
    let encoding = Encoding::for_label(label.as_bytes())?;
    if encoding == encoding_rs::UTF_8 {
        Some(DeclaredEncoding::Utf8)
    } else {
        Some(DeclaredEncoding::Known(encoding))
    }
}

fn detect_bom(bytes: &[u8]) -> Option<(Bom, usize)> {
    // 4-byte signatures first: the UTF-32LE BOM starts with the UTF-16LE one.
    if bytes.starts_with(UTF_32BE_BOM) {
        return Some((Bom::Utf32Be, 4));
    }
    if bytes.starts_with(UTF_32LE_BOM) {
        return Some((Bom::Utf32Le, 4));
    }
    if bytes.starts_with(UTF_8_BOM) {
        return Some((Bom::Utf8, 3));
    }
    if bytes.starts_with(UTF_16BE_BOM) {
        return Some((Bom::Utf16Be, 2));
    }
    if bytes.starts_with(UTF_16LE_BOM) {
        return Some((Bom::Utf16Le, 2));
    }
    None
}

fn decode_after_bom(bom: Bom, rest: &[u8]) -> String {
    match bom {
        Bom::Utf8 => lossy_utf8(rest),
        Bom::Utf16Be => decode_dropping_invalid(UTF_16BE, rest),
        Bom::Utf16Le => decode_dropping_invalid(UTF_16LE, rest),
        Bom::Utf32Be => decode_utf32(rest, u32::from_be_bytes),
        Bom::Utf32Le => decode_utf32(rest, u32::from_le_bytes),
    }
}

fn decode_utf32(bytes: &[u8], to_u32: fn([u8; 4]) -> u32) -> String {
    bytes
        .chunks_exact(4)
        .filter_map(|chunk| {
            let mut unit = [0u8; 4];
            unit.copy_from_slice(chunk);
            char::from_u32(to_u32(unit))
        })
        .collect()
}

/// Transcode to UTF-8, dropping undecodable sequences entirely.
fn decode_dropping_invalid(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let (decoded, _had_errors) = encoding.decode_without_bom_handling(bytes);
    strip_replacement(&decoded)
}

fn decodes_cleanly(encoding: &'static Encoding, bytes: &[u8]) -> bool {
    let (_, had_errors) = encoding.decode_without_bom_handling(bytes);
    !had_errors
}

fn guess_and_decode(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    for candidate in [EUC_JP, SHIFT_JIS] {
        if decodes_cleanly(candidate, bytes) {
            let (decoded, _) = candidate.decode_without_bom_handling(bytes);
            return decoded.into_owned();
        }
    }
    // Last resort: force UTF-8, scrub invalid sequences, drop control chars.
    lossy_utf8(bytes)
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

fn lossy_utf8(bytes: &[u8]) -> String {
    strip_replacement(&String::from_utf8_lossy(bytes))
}

fn strip_replacement(text: &str) -> String {
    if text.contains('\u{FFFD}') {
        text.chars().filter(|c| *c != '\u{FFFD}').collect()
    } else {
        text.to_string()
    }
}

fn truncate_to_char_boundary(mut text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text
}
