#[cfg(test)]
#[path = "math_blocks_test.rs"]
mod tests;

use once_cell::sync::Lazy;
use regex::Captures;
use regex::Regex;

use super::html::escape;

static FENCED_CODE: Lazy<Regex> =
    Lazy::new(|| return Regex::new(r"(?s)```.*?```").expect("valid fence pattern"));

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| return Regex::new(r"`[^`]*`").expect("valid inline code pattern"));

static DISPLAY_MATH: Lazy<Regex> = Lazy::new(|| {
    return Regex::new(r"(?s)\$\$.*?\$\$|\\\[.*?\\\]").expect("valid display math pattern");
});

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| return Regex::new(r"@@MATHBLOCK_(\d+)@@").expect("valid placeholder pattern"));

static STRONG_SPAN: Lazy<Regex> =
    Lazy::new(|| return Regex::new(r"(?s)\*\*(.*?)\*\*").expect("valid strong pattern"));

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| {
    return Regex::new("[\r\n\u{2028}\u{2029}]+").expect("valid line break pattern");
});

fn split_keep<'a>(text: &'a str, pattern: &Regex, mut f: impl FnMut(&'a str, bool)) {
    let mut cursor = 0;
    for found in pattern.find_iter(text) {
        f(&text[cursor..found.start()], false);
        f(found.as_str(), true);
        cursor = found.end();
    }
    f(&text[cursor..], false);
}

/// Applies `f` to every span of `text` that is not fenced or inline code.
pub fn map_outside_code(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut res = String::with_capacity(text.len());
    split_keep(text, &FENCED_CODE, |part, is_fence| {
        if is_fence {
            res.push_str(part);
            return;
        }

        split_keep(part, &INLINE_CODE, |chunk, is_code| {
            if is_code {
                res.push_str(chunk);
            } else {
                res.push_str(&f(chunk));
            }
        });
    });

    return res;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShieldedText {
    pub text: String,
    pub blocks: Vec<String>,
}

/// Swaps display math for placeholders so markdown leaves it untouched.
pub fn shield(text: &str) -> ShieldedText {
    if !text.contains("$$") && !text.contains("\\[") {
        return ShieldedText {
            text: text.to_string(),
            blocks: vec![],
        };
    }

    let mut blocks: Vec<String> = vec![];
    let shielded = map_outside_code(text, |chunk| {
        return DISPLAY_MATH
            .replace_all(chunk, |caps: &Captures| {
                let id = blocks.len();
                blocks.push(caps[0].to_string());
                return format!("@@MATHBLOCK_{id}@@");
            })
            .to_string();
    });

    return ShieldedText {
        text: shielded,
        blocks,
    };
}

pub fn restore(html: &str, blocks: &[String]) -> String {
    if blocks.is_empty() {
        return html.to_string();
    }

    return PLACEHOLDER
        .replace_all(html, |caps: &Captures| {
            let raw = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|idx| return blocks.get(idx));

            return match raw {
                Some(raw) => format!("<div class=\"math-block\">{}</div>", escape(raw.trim())),
                None => caps[0].to_string(),
            };
        })
        .to_string();
}

/// A bold span broken across lines does not parse as bold. Pull it onto one
/// line first.
pub fn normalize_strong_line_breaks(text: &str) -> String {
    if !text.contains("**") {
        return text.to_string();
    }

    return map_outside_code(text, |chunk| {
        return STRONG_SPAN
            .replace_all(chunk, |caps: &Captures| {
                let inner = &caps[1];
                if !LINE_BREAKS.is_match(inner) {
                    return caps[0].to_string();
                }
                return format!("**{}**", LINE_BREAKS.replace_all(inner, " "));
            })
            .to_string();
    });
}

const SKIPPED_TAGS: [&str; 4] = ["code", "pre", "script", "style"];

fn tag_name(tag: &str) -> (String, bool) {
    let inner = tag.trim_start_matches('<');
    let closing = inner.starts_with('/');
    let name = inner
        .trim_start_matches('/')
        .chars()
        .take_while(|c| return c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    return (name, closing);
}

fn push_strong_text(res: &mut String, text: &str) {
    let mut cursor = 0;
    while let Some(start) = text[cursor..].find("**").map(|i| return i + cursor) {
        let end = match text[start + 2..].find("**") {
            Some(i) => i + start + 2,
            None => break,
        };

        res.push_str(&text[cursor..start]);
        res.push_str("<strong>");
        res.push_str(&text[start + 2..end]);
        res.push_str("</strong>");
        cursor = end + 2;
    }
    res.push_str(&text[cursor..]);
}

/// Turns `**x**` pairs the markdown pass left as literal text into bold,
/// outside code, scripts and diagrams.
pub fn apply_fallback_strong(html: &str) -> String {
    if !html.contains("**") {
        return html.to_string();
    }

    let mut res = String::with_capacity(html.len());
    let mut skip_depth = 0usize;
    let mut open_divs: Vec<bool> = vec![];
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        let text = &rest[..lt];
        if skip_depth > 0 {
            res.push_str(text);
        } else {
            push_strong_text(&mut res, text);
        }

        let gt = match rest[lt..].find('>') {
            Some(i) => lt + i,
            None => {
                res.push_str(&rest[lt..]);
                rest = "";
                break;
            }
        };

        let tag = &rest[lt..=gt];
        let (name, closing) = tag_name(tag);
        if name == "div" {
            if closing {
                if open_divs.pop() == Some(true) {
                    skip_depth = skip_depth.saturating_sub(1);
                }
            } else {
                let is_diagram = tag.contains("class=\"mermaid\"");
                if is_diagram {
                    skip_depth += 1;
                }
                open_divs.push(is_diagram);
            }
        } else if SKIPPED_TAGS.contains(&name.as_str()) && !tag.ends_with("/>") {
            if closing {
                skip_depth = skip_depth.saturating_sub(1);
            } else {
                skip_depth += 1;
            }
        }

        res.push_str(tag);
        rest = &rest[gt + 1..];
    }

    if skip_depth > 0 {
        res.push_str(rest);
    } else {
        push_strong_text(&mut res, rest);
    }

    return res;
}
