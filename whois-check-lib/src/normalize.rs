//! Response normalization.
//!
//! Raw server bytes arrive in whatever charset the registry uses. They are
//! decoded to UTF-8 and markup-escaped so the text is safe to embed in HTML.

use encoding_rs::{Encoding, ISO_8859_15, UTF_8, WINDOWS_1252};
use lazy_static::lazy_static;
use regex::bytes::Regex as BytesRegex;

// Tags and comments, across lines
lazy_static! {
    static ref MARKUP_PATTERN: BytesRegex = BytesRegex::new(r"(?s)<!--.*?-->|<[^>]*>").unwrap();
}

/// Candidate charsets in priority order.
///
/// `WINDOWS_1252` stands for the ISO-8859-1 label (WHATWG maps one to the
/// other); [`decode`] still decodes it as strict Latin-1.
pub fn candidate_encodings() -> [&'static Encoding; 3] {
    [UTF_8, WINDOWS_1252, ISO_8859_15]
}

/// First candidate charset that decodes `bytes` without malformed sequences.
pub fn detect_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    candidate_encodings().into_iter().find(|encoding| {
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .is_some()
    })
}

/// Decode `bytes` to UTF-8 using the detected charset.
///
/// Latin-1 bytes 0x80-0x9F become the C1 controls U+0080-U+009F rather than
/// windows-1252 glyphs.
pub fn decode(bytes: &[u8]) -> String {
    match detect_encoding(bytes) {
        Some(encoding) if encoding == WINDOWS_1252 => {
            tracing::trace!(encoding = "ISO-8859-1", "Decoding response");
            encoding_rs::mem::decode_latin1(bytes).into_owned()
        }
        Some(encoding) => {
            tracing::trace!(encoding = encoding.name(), "Decoding response");
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            text.into_owned()
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Escape `&`, `<`, `>` and `"`. Existing entities are escaped again and
/// single quotes are left alone.
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Decode and escape a raw response.
pub fn normalize(bytes: &[u8]) -> String {
    escape_markup(&decode(bytes))
}

/// Insert `<br />` before every line break, keeping the break itself.
///
/// `\r\n` and `\n\r` count as one break.
pub fn line_breaks_to_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' | '\n' => {
                out.push_str("<br />");
                out.push(c);
                let pair = if c == '\r' { '\n' } else { '\r' };
                if chars.peek() == Some(&pair) {
                    out.push(pair);
                    chars.next();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Remove tags and comments from an HTML body.
pub fn strip_markup(bytes: &[u8]) -> Vec<u8> {
    MARKUP_PATTERN.replace_all(bytes, &b""[..]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8() {
        assert_eq!(detect_encoding("Domain: bücher.de".as_bytes()), Some(UTF_8));
        assert_eq!(detect_encoding(b"plain ascii"), Some(UTF_8));
    }

    #[test]
    fn test_detect_latin1() {
        // "Müller" in ISO-8859-1; 0xFC alone is not valid UTF-8
        let bytes = b"Registrant: M\xfcller";
        assert_eq!(detect_encoding(bytes), Some(WINDOWS_1252));
        assert_eq!(decode(bytes), "Registrant: Müller");
    }

    #[test]
    fn test_latin1_c1_range_is_not_windows_1252() {
        // 0x80 is the euro sign in windows-1252 but U+0080 in ISO-8859-1
        assert_eq!(decode(b"Fee: \x80 5, \x9f"), "Fee: \u{80} 5, \u{9f}");
        assert_eq!(normalize(b"\x93quoted\x94"), "\u{93}quoted\u{94}");
    }

    #[test]
    fn test_escape_markup() {
        assert_eq!(
            escape_markup(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; 'Jerry'&lt;/a&gt;"
        );
        assert_eq!(escape_markup("&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(b"Name: <none>\r\n"), "Name: &lt;none&gt;\r\n");
        assert_eq!(normalize(b"Ort: K\xf6ln"), "Ort: Köln");
    }

    #[test]
    fn test_line_breaks_to_markup() {
        assert_eq!(line_breaks_to_markup("a\nb"), "a<br />\nb");
        assert_eq!(line_breaks_to_markup("a\r\nb"), "a<br />\r\nb");
        assert_eq!(line_breaks_to_markup("a\n\rb"), "a<br />\n\rb");
        assert_eq!(line_breaks_to_markup("a\rb"), "a<br />\rb");
        assert_eq!(line_breaks_to_markup("a\n\nb"), "a<br />\n<br />\nb");
        assert_eq!(line_breaks_to_markup("no breaks"), "no breaks");
    }

    #[test]
    fn test_strip_markup() {
        let html = b"<html><!-- hidden\n note --><body><p>Domain: example.ex</p>\n<b>free</b></body></html>";
        assert_eq!(strip_markup(html), b"Domain: example.ex\nfree".to_vec());
    }
}
