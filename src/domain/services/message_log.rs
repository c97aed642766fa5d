#[cfg(test)]
#[path = "message_log_test.rs"]
mod tests;

use crate::domain::models::Message;

/// Ordered turns of the active session. Indices are only meaningful until the
/// session changes.
#[derive(Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        return self.messages.len() - 1;
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        return self.messages.get(index);
    }

    /// Keeps the first `keep` entries and returns how many were dropped.
    pub fn truncate(&mut self, keep: usize) -> usize {
        let keep = keep.min(self.messages.len());
        let removed = self.messages.len() - keep;
        self.messages.truncate(keep);
        return removed;
    }

    /// Returns false when `index` does not exist.
    pub fn replace_content(&mut self, index: usize, content: &str) -> bool {
        if let Some(message) = self.messages.get_mut(index) {
            message.content = content.to_string();
            return true;
        }

        return false;
    }

    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn len(&self) -> usize {
        return self.messages.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.messages.is_empty();
    }

    pub fn messages(&self) -> &[Message] {
        return &self.messages;
    }
}
