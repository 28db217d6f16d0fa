//! Gmail message content extraction
//!
//! Header lookup and text-body extraction from the MIME part tree.

use base64::{engine::general_purpose, Engine};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GatewayError, Result, ValidationError};
use crate::google::types::MessagePart;

static BR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>\n?").expect("br regex is valid"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"));

/// Decode base64url data from the Gmail API
/// Handles both padded and non-padded encodings
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| general_purpose::URL_SAFE.decode(data))
        .or_else(|_| general_purpose::STANDARD.decode(data))
        .map_err(|e| {
            GatewayError::Validation(ValidationError::InvalidParameter {
                name: "base64 data".to_string(),
                message: e.to_string(),
            })
        })
}

/// Find header value by name (case-insensitive); missing headers are empty
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> &'a str {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
        .unwrap_or("")
}

/// A decoded `text/*` part
struct TextPart {
    mime_type: String,
    data: String,
}

fn collect_text_parts(part: &MessagePart, out: &mut Vec<TextPart>) {
    let mime_type = part.mime_type.as_deref().unwrap_or("");

    if mime_type.starts_with("text/") {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            match decode_base64url(data) {
                Ok(bytes) => out.push(TextPart {
                    mime_type: mime_type.to_string(),
                    data: String::from_utf8_lossy(&bytes).into_owned(),
                }),
                Err(e) => tracing::debug!("Failed to decode {} part: {}", mime_type, e),
            }
        }
    }

    for nested in &part.parts {
        collect_text_parts(nested, out);
    }
}

/// Strip an HTML body down to text
pub fn html_to_text(html: &str) -> String {
    let with_breaks = BR_RE.replace_all(html, "\n");
    TAG_RE.replace_all(&with_breaks, "").trim().to_string()
}

/// Extract a readable body: first plain-text part, else the first HTML part
/// reduced to text, else an empty string
pub fn extract_body(payload: &MessagePart) -> String {
    let mut parts = Vec::new();
    collect_text_parts(payload, &mut parts);

    if let Some(text) = parts.iter().find(|p| p.mime_type == "text/plain") {
        return text.data.clone();
    }
    if let Some(html) = parts.iter().find(|p| p.mime_type == "text/html") {
        return html_to_text(&html.data);
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::types::{Header, MessagePartBody};

    fn encode(text: &str) -> String {
        general_purpose::URL_SAFE_NO_PAD.encode(text)
    }

    fn leaf(mime_type: &str, text: &str) -> MessagePart {
        MessagePart {
            mime_type: Some(mime_type.to_string()),
            body: Some(MessagePartBody {
                size: text.len() as i64,
                data: Some(encode(text)),
            }),
            ..Default::default()
        }
    }

    fn multipart(mime_type: &str, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: Some(mime_type.to_string()),
            parts,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_base64url() {
        let decoded = decode_base64url("SGVsbG8gV29ybGQ").unwrap();
        assert_eq!(decoded, b"Hello World");
        // url-safe alphabet
        assert_eq!(decode_base64url("Pz8_").unwrap(), b"???");
        assert!(decode_base64url("!!not base64!!").is_err());
    }

    #[test]
    fn test_find_header_case_insensitive() {
        let part = MessagePart {
            headers: vec![Header {
                name: "Subject".to_string(),
                value: "Hello".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(find_header(&part, "subject"), "Hello");
        assert_eq!(find_header(&part, "From"), "");
    }

    #[test]
    fn test_extract_body_prefers_plain_text() {
        let payload = multipart(
            "multipart/alternative",
            vec![leaf("text/html", "<p>Hi</p>"), leaf("text/plain", "Hi there")],
        );
        assert_eq!(extract_body(&payload), "Hi there");
    }

    #[test]
    fn test_extract_body_html_fallback() {
        let payload = multipart(
            "multipart/mixed",
            vec![multipart(
                "multipart/alternative",
                vec![leaf("text/html", "<div>Line one<br/>Line <b>two</b></div>  ")],
            )],
        );
        assert_eq!(extract_body(&payload), "Line one\nLine two");
    }

    #[test]
    fn test_extract_body_single_part() {
        assert_eq!(extract_body(&leaf("text/plain", "just text")), "just text");
    }

    #[test]
    fn test_extract_body_ignores_non_text() {
        let payload = multipart(
            "multipart/mixed",
            vec![leaf("application/pdf", "%PDF-1.4")],
        );
        assert_eq!(extract_body(&payload), "");
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(html_to_text("a<BR>b<br />c"), "a\nb\nc");
        assert_eq!(html_to_text("<br>\nx"), "x");
    }
}
