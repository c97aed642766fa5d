use super::render_markdown;
use crate::domain::services::code_blocks::COPY_BUTTON;

#[test]
fn it_renders_empty_text() {
    assert_eq!(render_markdown(""), "");
}

#[test]
fn it_renders_inline_markdown() {
    assert_eq!(
        render_markdown("Hello **world**"),
        "<p>Hello <strong>world</strong></p>\n"
    );
}

#[test]
fn it_renders_soft_breaks_as_line_breaks() {
    assert_eq!(render_markdown("a\nb"), "<p>a<br />\nb</p>\n");
}

#[test]
fn it_escapes_raw_html_blocks() {
    let res = render_markdown("<script>alert(1)</script>");
    assert!(res.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!res.contains("<script>"));
}

#[test]
fn it_escapes_inline_html() {
    let res = render_markdown("Hi <b>x</b>");
    assert!(res.contains("Hi &lt;b&gt;x&lt;/b&gt;"));
    assert!(!res.contains("<b>"));
}

#[test]
fn it_opens_links_externally() {
    assert_eq!(
        render_markdown("[site](https://example.com)"),
        "<p><a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">site</a></p>\n"
    );
}

#[test]
fn it_renders_fenced_code_with_copy_button() {
    let res = render_markdown("```rust\nfn main() {}\n```");
    assert_eq!(
        res,
        format!("<div class=\"code-block\"><pre><code class=\"language-rust\">fn main() {{}}</code></pre>{COPY_BUTTON}</div>\n")
    );
}

#[test]
fn it_renders_mermaid_fences_as_diagrams() {
    let res = render_markdown("```mermaid\ngraph TD; A-->B;\n```");
    assert_eq!(res, "<div class=\"mermaid\">graph TD; A--&gt;B;</div>\n");
}

#[test]
fn it_keeps_display_math_intact() {
    let res = render_markdown("$$x_1 * y_2 * z$$");
    assert_eq!(
        res,
        "<p><div class=\"math-block\">$$x_1 * y_2 * z$$</div></p>\n"
    );
}

#[test]
fn it_renders_tables() {
    let res = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |");
    assert!(res.contains("<table>"));
    assert!(res.contains("<td>1</td>"));
}

#[test]
fn it_renders_bold_split_across_lines() {
    assert_eq!(
        render_markdown("**Step\none**"),
        "<p><strong>Step one</strong></p>\n"
    );
}
