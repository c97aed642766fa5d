#[cfg(test)]
#[path = "content_renderer_test.rs"]
mod tests;

use once_cell::sync::Lazy;
use regex::Regex;

use super::code_blocks::decorate_code_blocks;
use super::html::escape;
use super::html::escape_multiline;
use super::markdown::render_markdown;
use super::think::extract_think;
use crate::domain::models::Activations;
use crate::domain::models::GenerationStats;
use crate::domain::models::NodeState;
use crate::domain::models::NodeView;
use crate::domain::models::Role;

pub const PENDING_LABEL: &str = "Thinking...";
pub const THINK_RUNNING_LABEL: &str = "Thinking...";
pub const THINK_DONE_LABEL: &str = "Thought process";

static MATH_DELIMITER: Lazy<Regex> =
    Lazy::new(|| return Regex::new(r"\$\$|\\\[|\\\(|\$").expect("valid math delimiter pattern"));

fn activations(markup: &str) -> Activations {
    return Activations {
        diagrams: markup.contains("class=\"mermaid\""),
        math: MATH_DELIMITER.is_match(markup),
    };
}

fn think_box(think: &str, open: bool) -> String {
    let (label, open_attr) = if open {
        (THINK_RUNNING_LABEL, " open")
    } else {
        (THINK_DONE_LABEL, "")
    };

    return format!(
        "<details class=\"think-box\"{open_attr}><summary>{}</summary><div class=\"think-content\">{}</div></details>\n",
        escape(label),
        render_markdown(think.trim())
    );
}

/// Renders message text into safe markup. User text is escaped verbatim,
/// assistant text goes through the reasoning split and markdown.
pub fn render_markup(role: Role, text: &str) -> String {
    if text.is_empty() {
        return "".to_string();
    }

    if role == Role::User {
        return escape_multiline(text);
    }

    let split = extract_think(text);
    let mut res = String::new();
    if !split.think.is_empty() {
        res.push_str(&think_box(&split.think, split.open));
    }
    if !split.main.is_empty() {
        res.push_str(&render_markdown(split.main.trim()));
    }

    return decorate_code_blocks(&res);
}

pub fn render(role: Role, text: &str) -> NodeView {
    let markup = render_markup(role, text);
    let activations = if role == Role::Assistant {
        activations(&markup)
    } else {
        Activations::default()
    };

    return NodeView {
        state: NodeState::Ready,
        source: text.to_string(),
        markup,
        activations,
    };
}

/// Shown in an assistant node until its first token arrives.
pub fn pending() -> NodeView {
    let markup = format!(
        "<div class=\"assistant-placeholder\"><span class=\"assistant-placeholder-text\">{}</span><span class=\"typing-dots\"><span></span><span></span><span></span></span></div>",
        escape(PENDING_LABEL)
    );

    return NodeView {
        state: NodeState::Pending,
        source: "".to_string(),
        markup,
        activations: Activations::default(),
    };
}

pub fn failure(message: &str) -> NodeView {
    return NodeView {
        state: NodeState::Failed,
        source: message.to_string(),
        markup: format!(
            "<span class=\"message-error\">Error: {}</span>",
            escape(message)
        ),
        activations: Activations::default(),
    };
}

/// Stats are shown exactly as the server reported them.
pub fn format_stats(stats: &GenerationStats) -> String {
    return format!(
        "{} tokens · {} t/s · {} s",
        stats.tokens, stats.speed, stats.time
    );
}

pub fn stats_footer(stats: &GenerationStats) -> String {
    return format!(
        "<div class=\"message-stats\"><span class=\"stat-item\"><strong>{}</strong> tokens</span><span class=\"stat-separator\"> · </span><span class=\"stat-item\"><strong>{}</strong> t/s</span><span class=\"stat-separator\"> · </span><span class=\"stat-item\"><strong>{}</strong>s</span></div>",
        stats.tokens, stats.speed, stats.time
    );
}
