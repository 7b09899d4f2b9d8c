//! HTML escaping for user-supplied text
//!
//! Values are escaped before storage, so any later rendering of order data
//! (admin views, e-mails, exports) is inert.

/// Trim and escape `<`, `>`, `"`, `'` and `/`
pub fn escape_html(input: &str) -> String {
    let trimmed = input.trim();
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            other => out.push(other),
        }
    }
    out
}
