#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::Attachment;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    // The server only ever stores two roles. Anything else renders as model output.
    #[serde(other)]
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Message {
        return Message {
            role,
            content: content.to_string(),
            attachments: vec![],
        };
    }

    pub fn user(content: &str, attachments: Vec<Attachment>) -> Message {
        return Message {
            role: Role::User,
            content: content.to_string(),
            attachments,
        };
    }

    pub fn placeholder() -> Message {
        return Message::new(Role::Assistant, "");
    }
}

/// Content as the server returns it. Older sessions store plain strings,
/// multimodal ones store fragment arrays or keyed objects.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    #[default]
    Empty,
    Text(String),
    Fragments(Vec<Value>),
    Keyed(Map<String, Value>),
    Other(Value),
}

fn keyed_text(map: &Map<String, Value>) -> Option<String> {
    for key in ["text", "content", "value"] {
        if let Some(Value::String(text)) = map.get(key) {
            return Some(text.to_string());
        }
    }

    return None;
}

fn fragment_text(fragment: &Value) -> String {
    return match fragment {
        Value::Null => "".to_string(),
        Value::String(text) => text.to_string(),
        Value::Object(map) => keyed_text(map).unwrap_or_else(|| return fragment.to_string()),
        other => other.to_string(),
    };
}

impl MessageContent {
    /// Flattens any content shape into the single string the log stores.
    pub fn normalize(&self) -> String {
        return match self {
            MessageContent::Empty => "".to_string(),
            MessageContent::Text(text) => text.to_string(),
            MessageContent::Fragments(fragments) => fragments
                .iter()
                .map(fragment_text)
                .collect::<Vec<String>>()
                .join(""),
            MessageContent::Keyed(map) => keyed_text(map)
                .unwrap_or_else(|| return Value::Object(map.clone()).to_string()),
            MessageContent::Other(Value::Null) => "".to_string(),
            MessageContent::Other(Value::String(text)) => text.to_string(),
            MessageContent::Other(other) => other.to_string(),
        };
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessagePayload {
    pub role: Role,
    #[serde(default)]
    pub content: MessageContent,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

impl From<MessagePayload> for Message {
    fn from(payload: MessagePayload) -> Message {
        return Message {
            role: payload.role,
            content: payload.content.normalize(),
            attachments: payload.attachments.unwrap_or_default(),
        };
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessagePayload>,
}

impl MessageList {
    pub fn into_messages(self) -> Vec<Message> {
        return self.messages.into_iter().map(Message::from).collect();
    }
}
