use super::StreamEvent;

/// Identifies one generation so late frames from a finished stream are ignored.
pub type GenerationId = u64;

pub enum Event {
    StreamFrame(GenerationId, StreamEvent),
    /// Sent exactly once per generation when its streaming task ends. Carries
    /// the transport error if the request or the body read failed.
    StreamClosed(GenerationId, Option<String>),
}
