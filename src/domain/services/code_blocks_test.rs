use super::code_block_markup;
use super::count_code_blocks;
use super::decorate_code_blocks;
use super::COPY_BUTTON;

#[test]
fn it_renders_labelled_code_blocks() {
    let res = code_block_markup("rust", "let a = 1 < 2;");
    insta::assert_snapshot!(res.trim_end(), @r###"<div class="code-block"><pre><code class="language-rust">let a = 1 &lt; 2;</code></pre><button class="code-copy-btn" type="button" title="Copy">Copy</button></div>"###);
}

#[test]
fn it_renders_unlabelled_code_blocks() {
    let res = code_block_markup("", "abc123");
    assert_eq!(
        res,
        format!("<div class=\"code-block\"><pre><code>abc123</code></pre>{COPY_BUTTON}</div>\n")
    );
}

#[test]
fn it_renders_diagram_blocks() {
    let res = code_block_markup("mermaid", "graph TD; A-->B;");
    assert_eq!(res, "<div class=\"mermaid\">graph TD; A--&gt;B;</div>\n");
}

#[test]
fn it_wraps_bare_blocks() {
    let res = decorate_code_blocks("<p>x</p><pre><code>a</code></pre>");
    assert_eq!(
        res,
        format!("<p>x</p><div class=\"code-block\"><pre><code>a</code></pre>{COPY_BUTTON}</div>")
    );
}

#[test]
fn it_adds_missing_buttons() {
    let res = decorate_code_blocks("<div class=\"code-block\"><pre><code>a</code></pre></div>");
    assert_eq!(
        res,
        format!("<div class=\"code-block\"><pre><code>a</code></pre>{COPY_BUTTON}</div>")
    );
}

#[test]
fn it_is_idempotent() {
    let html = format!(
        "{}<pre><code class=\"language-py\">print(1)</code></pre>",
        code_block_markup("rust", "fn main() {}")
    );
    let once = decorate_code_blocks(&html);
    let twice = decorate_code_blocks(&once);
    assert_eq!(once, twice);
    assert_eq!(once.matches("code-copy-btn").count(), 2);
    assert_eq!(once.matches("class=\"code-block\"").count(), 2);
    assert_eq!(count_code_blocks(&once), 2);
}

#[test]
fn it_ignores_html_without_code() {
    assert_eq!(decorate_code_blocks("<p>hi</p>"), "<p>hi</p>");
}
