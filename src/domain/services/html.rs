#[cfg(test)]
#[path = "html_test.rs"]
mod tests;

/// Escapes text for element content and double-quoted attribute values.
pub fn escape(text: &str) -> String {
    return html_escape::encode_double_quoted_attribute(text).into_owned();
}

/// Escapes user text and keeps its line breaks visible.
pub fn escape_multiline(text: &str) -> String {
    return escape(text).replace('\n', "<br>");
}
