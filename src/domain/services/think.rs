#[cfg(test)]
#[path = "think_test.rs"]
mod tests;

use once_cell::sync::Lazy;
use regex::Regex;

static THINK_OPEN: Lazy<Regex> = Lazy::new(|| {
    return Regex::new(r"(?i)<\s*think\s*>").expect("valid think open pattern");
});

static THINK_CLOSE: Lazy<Regex> = Lazy::new(|| {
    return Regex::new(r"(?i)<\s*/\s*think\s*>").expect("valid think close pattern");
});

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThinkSplit {
    pub think: String,
    pub main: String,
    /// The reasoning block has started but not closed yet.
    pub open: bool,
}

/// Splits model output into its reasoning span and the visible answer.
/// Only the first opener is honoured.
pub fn extract_think(content: &str) -> ThinkSplit {
    let open_match = match THINK_OPEN.find(content) {
        Some(found) => found,
        None => {
            return ThinkSplit {
                think: "".to_string(),
                main: content.to_string(),
                open: false,
            };
        }
    };

    let before = &content[..open_match.start()];
    let after_open = &content[open_match.end()..];

    if let Some(close_match) = THINK_CLOSE.find(after_open) {
        return ThinkSplit {
            think: after_open[..close_match.start()].to_string(),
            main: format!("{before}{}", &after_open[close_match.end()..]),
            open: false,
        };
    }

    return ThinkSplit {
        think: after_open.to_string(),
        main: before.to_string(),
        open: true,
    };
}
