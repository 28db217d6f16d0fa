//! Outgoing message template
//!
//! Every mail sent through the gateway uses the same layout: the caller's body
//! in a light panel followed by a signature block.

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the HTML alternative of a message body
pub fn render_html(body: &str, sender_name: &str) -> String {
    let content = escape_html(body).replace("\r\n", "\n").replace('\n', "<br>");
    let name = escape_html(sender_name);

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #f8f9fa; padding: 20px; border-radius: 8px;">
    {content}
  </div>
  <div style="margin-top: 20px; padding: 15px; border-top: 1px solid #dee2e6;">
    <p style="margin: 0; color: #6c757d; font-size: 14px;">
      Best regards,<br>
      <strong>{name}</strong>
    </p>
  </div>
</div>"#
    )
}

/// Render the plain-text alternative of a message body
pub fn render_text(body: &str, sender_name: &str) -> String {
    format!("{}\n\nBest regards,\n{}", body, sender_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text() {
        assert_eq!(
            render_text("Hello", "Ana"),
            "Hello\n\nBest regards,\nAna"
        );
    }

    #[test]
    fn test_render_html_converts_newlines() {
        let html = render_html("line one\nline two", "Ana");
        assert!(html.contains("line one<br>line two"));
        assert!(html.contains("<strong>Ana</strong>"));
    }

    #[test]
    fn test_render_html_escapes_body() {
        let html = render_html("<script>alert('x')</script> & more", "Ana");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; more"));
    }
}
