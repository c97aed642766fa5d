use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::Attachment;
use super::DeletedSession;
use super::Message;
use super::Session;
use super::SessionList;

/// Raw response body of a generation request, chunked as it arrives.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatStreamRequest {
    pub session_id: String,
    pub text: String,
    pub config: Map<String, Value>,
    pub attachments: Vec<Attachment>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegenerateRequest {
    pub session_id: String,
    pub config: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EditRequest {
    pub index: usize,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetryRequest {
    pub index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ModelStatus {
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub loading: bool,
}

#[async_trait]
pub trait Backend {
    /// Used at startup to verify the chat server is reachable.
    async fn health_check(&self) -> Result<()>;

    async fn list_sessions(&self) -> Result<SessionList>;

    async fn create_session(&self, temporary: bool) -> Result<Session>;

    async fn select_session(&self, session_id: &str) -> Result<()>;

    async fn rename_session(&self, session_id: &str, title: &str) -> Result<()>;

    async fn delete_session(&self, session_id: &str) -> Result<DeletedSession>;

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Persists an edited user turn. The server drops every later turn.
    async fn edit_message(&self, session_id: &str, req: EditRequest) -> Result<()>;

    /// Persists dropping an assistant turn and everything after it.
    async fn retry_message(&self, session_id: &str, req: RetryRequest) -> Result<()>;

    /// Opens a generation for a new user turn. The body is a sequence of
    /// `data: ` frames, see `StreamConsumer`.
    async fn start_chat_stream(&self, req: ChatStreamRequest) -> Result<ByteStream>;

    /// Opens a generation answering the last stored user turn.
    async fn regenerate_stream(&self, req: RegenerateRequest) -> Result<ByteStream>;

    /// Advisory. The server ends the active stream with a `done` frame.
    async fn stop_generation(&self) -> Result<()>;

    async fn model_status(&self) -> Result<ModelStatus>;

    /// Option keys the model at `model_path` honours.
    async fn supported_keys(&self, model_path: &str) -> Result<BTreeSet<String>>;
}

pub type BackendBox = Arc<dyn Backend + Send + Sync>;
