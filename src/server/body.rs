//! Request body -> script text, whatever the declared content type.

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn declares_utf16(content_type: &str) -> bool {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .any(|(k, v)| {
            k.trim().eq_ignore_ascii_case("charset")
                && matches!(
                    v.trim().trim_matches('"').to_ascii_lowercase().as_str(),
                    "utf-16" | "utf-16le"
                )
        })
}

/// Lossy UTF-16LE; a dangling odd byte becomes U+FFFD.
fn utf16le(bytes: &[u8]) -> String {
    let pairs = bytes.chunks_exact(2);
    let truncated = !pairs.remainder().is_empty();
    let units: Vec<u16> = pairs
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let mut text = String::from_utf16_lossy(&units);
    if truncated {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

/// Decode a request body into script text.
///
/// The body is UTF-8 unless it carries a UTF-16LE BOM or charset. A
/// non-empty urlencoded form is flattened back into text by concatenating
/// each pair as `key` or `key=value`, which recovers a script sent with
/// `curl -d`.
pub fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> String {
    let content_type = content_type.unwrap_or_default();

    let text = if let Some(rest) = bytes.strip_prefix(UTF16LE_BOM) {
        utf16le(rest)
    } else if declares_utf16(content_type) {
        utf16le(bytes)
    } else {
        String::from_utf8_lossy(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)).into_owned()
    };

    if media_type(content_type) == "application/x-www-form-urlencoded" {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(text.as_bytes())
            .into_owned()
            .collect();
        if !pairs.is_empty() {
            return pairs
                .into_iter()
                .map(|(k, v)| if v.is_empty() { k } else { format!("{k}={v}") })
                .collect();
        }
    }
    text
}
