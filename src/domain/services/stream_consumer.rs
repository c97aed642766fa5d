#[cfg(test)]
#[path = "stream_consumer_test.rs"]
mod tests;

use anyhow::Result;
use futures::StreamExt;

use crate::domain::models::ByteStream;
use crate::domain::models::StreamEvent;

const FRAME_PREFIX: &str = "data: ";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameMode {
    /// Every chunk is decoded on its own. A frame split across two reads is
    /// lost, matching how the chat server's own web client behaves.
    #[default]
    PerChunk,
    /// Incomplete lines are carried over to the next chunk.
    Reassemble,
}

#[derive(Default)]
pub struct StreamConsumer {
    mode: FrameMode,
    carry: Vec<u8>,
}

fn decode_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(FRAME_PREFIX)?;
    return match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::debug!(error = ?err, line = line, "Dropping undecodable frame");
            None
        }
    };
}

fn decode_text(text: &str) -> Vec<StreamEvent> {
    return text.split('\n').filter_map(decode_line).collect();
}

impl StreamConsumer {
    pub fn new(mode: FrameMode) -> StreamConsumer {
        return StreamConsumer {
            mode,
            carry: vec![],
        };
    }

    /// Decodes every complete frame available after reading `chunk`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.mode == FrameMode::PerChunk {
            return decode_text(&String::from_utf8_lossy(chunk));
        }

        self.carry.extend_from_slice(chunk);
        let last_newline = match self.carry.iter().rposition(|b| return *b == b'\n') {
            Some(pos) => pos,
            None => return vec![],
        };

        let complete = self.carry.drain(..=last_newline).collect::<Vec<u8>>();
        return decode_text(&String::from_utf8_lossy(&complete));
    }

    /// Flushes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.carry.is_empty() {
            return vec![];
        }

        let rest = std::mem::take(&mut self.carry);
        return decode_text(&String::from_utf8_lossy(&rest));
    }

    /// Reads `stream` to its end, handing each decoded event to `on_event`.
    pub async fn consume<F>(&mut self, mut stream: ByteStream, mut on_event: F) -> Result<()>
    where
        F: FnMut(StreamEvent) -> Result<()>,
    {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in self.push(&chunk) {
                tracing::debug!(event = ?event, "Stream frame");
                on_event(event)?;
            }
        }

        for event in self.finish() {
            on_event(event)?;
        }

        return Ok(());
    }
}
