use test_utils::codeblock_fixture;
use test_utils::think_fixture;

use super::failure;
use super::format_stats;
use super::pending;
use super::render;
use super::render_markup;
use super::stats_footer;
use crate::domain::models::GenerationStats;
use crate::domain::models::NodeState;
use crate::domain::models::Role;
use crate::domain::services::code_blocks::count_code_blocks;

#[test]
fn it_renders_empty_content() {
    assert_eq!(render_markup(Role::Assistant, ""), "");
    assert_eq!(render_markup(Role::User, ""), "");
}

#[test]
fn it_escapes_user_content() {
    let view = render(Role::User, "<b>hi</b>\n**there**");
    assert_eq!(view.markup, "&lt;b&gt;hi&lt;/b&gt;<br>**there**");
    assert_eq!(view.state, NodeState::Ready);
    assert!(!view.activations.any());
}

#[test]
fn it_renders_closed_think_blocks_collapsed() {
    let res = render_markup(Role::Assistant, "<think>plan</think>Answer");
    assert_eq!(
        res,
        "<details class=\"think-box\"><summary>Thought process</summary><div class=\"think-content\"><p>plan</p>\n</div></details>\n<p>Answer</p>\n"
    );
}

#[test]
fn it_renders_open_think_blocks_expanded() {
    let res = render_markup(Role::Assistant, "Intro<think>still going");
    assert!(res.contains("<details class=\"think-box\" open><summary>Thinking...</summary>"));
    assert!(res.contains("<p>still going</p>"));
    assert!(res.ends_with("<p>Intro</p>\n"));
}

#[test]
fn it_renders_the_think_fixture() {
    let view = render(Role::Assistant, think_fixture());
    assert!(view
        .markup
        .contains("<p>The user says hello. I should greet them back.</p>"));
    assert!(view.markup.contains("<p>Hi there! How can I help?</p>"));
    assert_eq!(view.source, think_fixture());
}

#[test]
fn it_renders_the_codeblock_fixture() {
    let view = render(Role::Assistant, codeblock_fixture());
    assert_eq!(count_code_blocks(&view.markup), 2);
    assert_eq!(view.markup.matches("code-copy-btn").count(), 2);
    assert!(view.markup.contains("class=\"language-rust\""));
    assert!(view.activations.diagrams);
}

#[test]
fn it_flags_math_for_activation() {
    let view = render(Role::Assistant, "Area is $\\pi r^2$");
    assert!(view.activations.math);
    assert!(!view.activations.diagrams);

    let view = render(Role::Assistant, "No formulas here.");
    assert!(!view.activations.any());
}

#[test]
fn it_renders_pending_placeholder() {
    let view = pending();
    assert_eq!(view.state, NodeState::Pending);
    assert!(view.markup.contains("assistant-placeholder"));
    assert!(view.markup.contains("Thinking..."));
    assert_eq!(view.source, "");
}

#[test]
fn it_renders_escaped_failures() {
    let view = failure("model <crashed>");
    assert_eq!(view.state, NodeState::Failed);
    assert_eq!(
        view.markup,
        "<span class=\"message-error\">Error: model &lt;crashed&gt;</span>"
    );
}

#[test]
fn it_formats_stats() {
    let stats = GenerationStats {
        tokens: 12,
        speed: 3.46,
        time: 2.5,
    };
    assert_eq!(format_stats(&stats), "12 tokens · 3.46 t/s · 2.5 s");
    insta::assert_snapshot!(stats_footer(&stats), @r###"<div class="message-stats"><span class="stat-item"><strong>12</strong> tokens</span><span class="stat-separator"> · </span><span class="stat-item"><strong>3.46</strong> t/s</span><span class="stat-separator"> · </span><span class="stat-item"><strong>2.5</strong>s</span></div>"###);
}
