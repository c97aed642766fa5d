#[cfg(test)]
#[path = "code_blocks_test.rs"]
mod tests;

use once_cell::sync::Lazy;
use regex::Captures;
use regex::Regex;

use super::html::escape;

pub const COPY_BUTTON: &str =
    "<button class=\"code-copy-btn\" type=\"button\" title=\"Copy\">Copy</button>";

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    return Regex::new(
        r#"(?s)(<div class="code-block">\s*)?(<pre><code[^>]*>.*?</code></pre>)(\s*<button class="code-copy-btn"[^>]*>.*?</button>)?"#,
    )
    .expect("valid code block pattern");
});

/// Markup for one fenced block. Diagram fences are left for the diagram
/// renderer instead of being shown as code.
pub fn code_block_markup(lang: &str, code: &str) -> String {
    let escaped = escape(code);
    if lang == "mermaid" {
        return format!("<div class=\"mermaid\">{escaped}</div>\n");
    }

    let class = if lang.is_empty() {
        "".to_string()
    } else {
        format!(" class=\"language-{}\"", escape(lang))
    };

    return format!(
        "<div class=\"code-block\"><pre><code{class}>{escaped}</code></pre>{COPY_BUTTON}</div>\n"
    );
}

/// Ensures every `<pre><code>` block is wrapped once and carries exactly one
/// copy button. Running it again changes nothing.
pub fn decorate_code_blocks(html: &str) -> String {
    if !html.contains("<pre><code") {
        return html.to_string();
    }

    return CODE_BLOCK
        .replace_all(html, |caps: &Captures| {
            let pre = &caps[2];
            return match (caps.get(1), caps.get(3)) {
                (Some(_), Some(_)) => caps[0].to_string(),
                (Some(wrapper), None) => format!("{}{pre}{COPY_BUTTON}", wrapper.as_str()),
                (None, Some(button)) => {
                    format!("<div class=\"code-block\">{pre}{}</div>", button.as_str())
                }
                (None, None) => format!("<div class=\"code-block\">{pre}{COPY_BUTTON}</div>"),
            };
        })
        .to_string();
}

#[cfg(test)]
pub fn count_code_blocks(html: &str) -> usize {
    return CODE_BLOCK.find_iter(html).count();
}
