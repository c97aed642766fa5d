#[cfg(test)]
#[path = "attachment_test.rs"]
mod tests;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    return Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false));
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub content: String,
    #[serde(default, deserialize_with = "null_as_false")]
    pub truncated: bool,
}

impl Attachment {
    pub fn new(name: &str, content: &str, truncated: bool) -> Attachment {
        return Attachment {
            name: name.to_string(),
            content: content.to_string(),
            truncated,
        };
    }
}

/// Builds the text shown for a user turn: the typed text followed by a note
/// naming every attached file.
pub fn display_text(text: &str, attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return text.to_string();
    }

    let names = attachments
        .iter()
        .map(|attachment| return attachment.name.as_str())
        .collect::<Vec<&str>>()
        .join(", ");

    let note = if names.is_empty() {
        "[Attachments]".to_string()
    } else {
        format!("[Attachments: {names}]")
    };

    if text.is_empty() {
        return note;
    }

    return format!("{text}\n\n{note}");
}
