use super::apply_fallback_strong;
use super::normalize_strong_line_breaks;
use super::restore;
use super::shield;

#[test]
fn it_leaves_text_without_math_alone() {
    let res = shield("No math here, just $5.");
    assert_eq!(res.text, "No math here, just $5.");
    assert!(res.blocks.is_empty());
}

#[test]
fn it_shields_display_math() {
    let res = shield("Euler: $$e^{i\\pi} + 1 = 0$$ and \\[a < b\\] done");
    assert_eq!(
        res.text,
        "Euler: @@MATHBLOCK_0@@ and @@MATHBLOCK_1@@ done"
    );
    assert_eq!(res.blocks, vec!["$$e^{i\\pi} + 1 = 0$$", "\\[a < b\\]"]);
}

#[test]
fn it_shields_multiline_math() {
    let res = shield("$$\nx = 1\n$$");
    assert_eq!(res.text, "@@MATHBLOCK_0@@");
    assert_eq!(res.blocks, vec!["$$\nx = 1\n$$"]);
}

#[test]
fn it_skips_math_inside_code() {
    let text = "```\n$$x$$\n```\nand `$$y$$` but $$z$$";
    let res = shield(text);
    assert_eq!(res.text, "```\n$$x$$\n```\nand `$$y$$` but @@MATHBLOCK_0@@");
    assert_eq!(res.blocks, vec!["$$z$$"]);
}

#[test]
fn it_restores_escaped_blocks() {
    let blocks = vec!["$$ a<b $$".to_string()];
    let res = restore("<p>@@MATHBLOCK_0@@</p>", &blocks);
    assert_eq!(res, "<p><div class=\"math-block\">$$ a&lt;b $$</div></p>");
}

#[test]
fn it_keeps_unknown_placeholders() {
    let blocks = vec!["$$a$$".to_string()];
    let res = restore("@@MATHBLOCK_7@@", &blocks);
    assert_eq!(res, "@@MATHBLOCK_7@@");
}

#[test]
fn it_flattens_bold_spans_across_lines() {
    let res = normalize_strong_line_breaks("**Step\none** then **two**");
    assert_eq!(res, "**Step one** then **two**");
}

#[test]
fn it_does_not_flatten_bold_in_code() {
    let text = "```\n**a\nb**\n```";
    assert_eq!(normalize_strong_line_breaks(text), text);
}

#[test]
fn it_applies_fallback_strong_to_text() {
    let res = apply_fallback_strong("<p>left **bold ** right</p>");
    assert_eq!(res, "<p>left <strong>bold </strong> right</p>");
}

#[test]
fn it_skips_fallback_strong_in_code_and_diagrams() {
    let html = "<pre><code>**a**</code></pre><div class=\"mermaid\">**b**</div><p>**c**</p>";
    let res = apply_fallback_strong(html);
    assert_eq!(
        res,
        "<pre><code>**a**</code></pre><div class=\"mermaid\">**b**</div><p><strong>c</strong></p>"
    );
}

#[test]
fn it_keeps_unpaired_markers() {
    assert_eq!(apply_fallback_strong("<p>a ** b</p>"), "<p>a ** b</p>");
}
