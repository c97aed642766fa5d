#[cfg(test)]
#[path = "markdown_test.rs"]
mod tests;

use pulldown_cmark::html;
use pulldown_cmark::CodeBlockKind;
use pulldown_cmark::CowStr;
use pulldown_cmark::Event;
use pulldown_cmark::Options;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use pulldown_cmark::TagEnd;

use super::code_blocks::code_block_markup;
use super::html::escape;
use super::math_blocks;

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    return options;
}

fn fence_language(kind: &CodeBlockKind) -> String {
    return match kind {
        CodeBlockKind::Fenced(info) => info
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase(),
        CodeBlockKind::Indented => "".to_string(),
    };
}

fn link_open(dest_url: &str, title: &str) -> String {
    let mut res = format!("<a href=\"{}\"", escape(dest_url));
    if !title.is_empty() {
        res = format!("{res} title=\"{}\"", escape(title));
    }

    return format!("{res} target=\"_blank\" rel=\"noopener noreferrer\">");
}

/// Rewrites parser events: raw HTML becomes text, soft breaks become line
/// breaks, fenced code becomes a copyable block, links open externally.
fn transform<'a>(parser: Parser<'a>) -> Vec<Event<'a>> {
    let mut events: Vec<Event<'a>> = vec![];
    let mut code: Option<(String, String)> = None;

    for event in parser {
        if let Some((lang, buffer)) = code.as_mut() {
            match event {
                Event::Text(text) => buffer.push_str(&text),
                Event::End(TagEnd::CodeBlock) => {
                    let body = buffer.strip_suffix('\n').unwrap_or(buffer.as_str());
                    events.push(Event::Html(CowStr::from(code_block_markup(lang, body))));
                    code = None;
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                code = Some((fence_language(&kind), String::new()));
            }
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => {
                events.push(Event::Html(CowStr::from(link_open(&dest_url, &title))));
            }
            Event::End(TagEnd::Link) => {
                events.push(Event::Html(CowStr::from("</a>")));
            }
            Event::Html(raw) | Event::InlineHtml(raw) => {
                events.push(Event::Text(raw));
            }
            Event::SoftBreak => {
                events.push(Event::HardBreak);
            }
            other => events.push(other),
        }
    }

    return events;
}

/// Renders one markdown document (an answer or a reasoning block) to HTML.
pub fn render_markdown(text: &str) -> String {
    if text.is_empty() {
        return "".to_string();
    }

    let normalized = math_blocks::normalize_strong_line_breaks(text);
    let shielded = math_blocks::shield(&normalized);

    let parser = Parser::new_ext(&shielded.text, options());
    let mut res = String::new();
    html::push_html(&mut res, transform(parser).into_iter());

    let res = math_blocks::apply_fallback_strong(&res);
    return math_blocks::restore(&res, &shielded.blocks);
}
