#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;

use std::collections::BTreeSet;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::content_renderer;
use super::message_log::MessageLog;
use super::stream_consumer::FrameMode;
use super::stream_consumer::StreamConsumer;
use crate::domain::models::display_text;
use crate::domain::models::Attachment;
use crate::domain::models::BackendBox;
use crate::domain::models::ChatStreamRequest;
use crate::domain::models::Event;
use crate::domain::models::GenerationConfig;
use crate::domain::models::GenerationId;
use crate::domain::models::GenerationStats;
use crate::domain::models::Message;
use crate::domain::models::NoticeLevel;
use crate::domain::models::RegenerateRequest;
use crate::domain::models::Role;
use crate::domain::models::StreamEvent;
use crate::domain::models::ViewSurface;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelState {
    pub loaded: bool,
    pub reload_required: bool,
    /// Option keys the loaded model honours. `None` until the server says.
    pub supported_keys: Option<BTreeSet<String>>,
}

/// Why an operation was refused before touching the log or the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum Rejection {
    #[strum(serialize = "No model is loaded")]
    ModelNotLoaded,
    #[strum(serialize = "The model settings changed, reload the model first")]
    ReloadRequired,
    #[strum(serialize = "A response is still being generated")]
    Busy,
    #[strum(serialize = "Type a message or attach a file first")]
    EmptyPrompt,
    #[strum(serialize = "No chat session is active")]
    NoSession,
    #[strum(serialize = "There is no message at that position")]
    NoSuchMessage,
    #[strum(serialize = "Only your own messages can be edited")]
    NotUserMessage,
    #[strum(serialize = "Only assistant replies can be retried")]
    NotAssistantMessage,
    #[strum(serialize = "The first message cannot be retried")]
    FirstMessage,
}

impl std::error::Error for Rejection {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationKind {
    Send,
    Regenerate,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GenerationOutcome {
    Finished {
        kind: GenerationKind,
        stats: Option<GenerationStats>,
    },
    /// The server reported an error frame.
    StreamFailed {
        kind: GenerationKind,
        message: String,
    },
    /// The request or the body read failed. Attachments of a failed send are
    /// handed back so they can be offered again.
    TransportFailed {
        kind: GenerationKind,
        message: String,
        attachments: Vec<Attachment>,
    },
}

struct ActiveGeneration {
    id: GenerationId,
    kind: GenerationKind,
    index: usize,
    buffer: String,
    attachments: Vec<Attachment>,
    error: Option<String>,
    stats: Option<GenerationStats>,
    task: JoinHandle<()>,
}

enum StreamRequest {
    Chat(ChatStreamRequest),
    Regenerate(RegenerateRequest),
}

/// Sends the closing event for a generation however its task ends,
/// including by panic or abort.
struct CloseGuard {
    id: GenerationId,
    tx: mpsc::UnboundedSender<Event>,
    error: Option<String>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        let _ = self
            .tx
            .send(Event::StreamClosed(self.id, self.error.take()));
    }
}

async fn run_stream(
    backend: BackendBox,
    request: StreamRequest,
    mode: FrameMode,
    id: GenerationId,
    tx: &mpsc::UnboundedSender<Event>,
) -> Result<()> {
    let stream = match request {
        StreamRequest::Chat(req) => backend.start_chat_stream(req).await?,
        StreamRequest::Regenerate(req) => backend.regenerate_stream(req).await?,
    };

    let mut consumer = StreamConsumer::new(mode);
    consumer
        .consume(stream, |event| {
            tx.send(Event::StreamFrame(id, event))?;
            return Ok(());
        })
        .await?;

    return Ok(());
}

pub struct GenerationController {
    backend: BackendBox,
    tx: mpsc::UnboundedSender<Event>,
    config: GenerationConfig,
    frame_mode: FrameMode,
    model: ModelState,
    active: Option<ActiveGeneration>,
    next_id: GenerationId,
}

impl GenerationController {
    pub fn new(
        backend: BackendBox,
        tx: mpsc::UnboundedSender<Event>,
        config: GenerationConfig,
        frame_mode: FrameMode,
    ) -> GenerationController {
        return GenerationController {
            backend,
            tx,
            config,
            frame_mode,
            model: ModelState::default(),
            active: None,
            next_id: 1,
        };
    }

    pub fn is_generating(&self) -> bool {
        return self.active.is_some();
    }

    pub fn model_state(&self) -> &ModelState {
        return &self.model;
    }

    pub fn set_model_state(&mut self, model: ModelState) {
        self.model = model;
    }

    /// Checks the model and the single-flight guard. Refusals are returned,
    /// never shown; the caller decides how to surface them.
    pub fn check_ready(&self) -> Result<(), Rejection> {
        if !self.model.loaded {
            return Err(Rejection::ModelNotLoaded);
        }
        if self.model.reload_required {
            return Err(Rejection::ReloadRequired);
        }
        if self.active.is_some() {
            return Err(Rejection::Busy);
        }

        return Ok(());
    }

    /// Every check `send` makes before it touches the log.
    pub fn check_send(&self, text: &str, attachments: &[Attachment]) -> Result<(), Rejection> {
        self.check_ready()?;
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(Rejection::EmptyPrompt);
        }

        return Ok(());
    }

    fn append_placeholder<S: ViewSurface>(&self, log: &mut MessageLog, surface: &mut S) -> usize {
        let index = log.append(Message::placeholder());
        surface.set_empty_state(false);
        surface.append_message(index, Role::Assistant, &content_renderer::pending());
        return index;
    }

    fn start(
        &mut self,
        kind: GenerationKind,
        index: usize,
        request: StreamRequest,
        attachments: Vec<Attachment>,
    ) {
        let id = self.next_id;
        self.next_id += 1;

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        let mode = self.frame_mode;
        let task = tokio::spawn(async move {
            let mut closer = CloseGuard {
                id,
                tx: tx.clone(),
                error: Some("The generation ended unexpectedly".to_string()),
            };

            let res = run_stream(backend, request, mode, id, &tx).await;
            closer.error = match res {
                Ok(_) => None,
                Err(err) => {
                    tracing::error!(error = ?err, "Generation stream failed");
                    Some(err.to_string())
                }
            };
        });

        tracing::info!(id = id, kind = ?kind, index = index, "Generation started");
        self.active = Some(ActiveGeneration {
            id,
            kind,
            index,
            buffer: String::new(),
            attachments,
            error: None,
            stats: None,
            task,
        });
    }

    /// Appends the user turn and a pending assistant turn, then starts
    /// streaming the reply. Returns the placeholder's index.
    pub fn send<S: ViewSurface>(
        &mut self,
        log: &mut MessageLog,
        surface: &mut S,
        session_id: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> Result<usize, Rejection> {
        self.check_send(text, attachments)?;

        let display = display_text(text, attachments);
        let user_index = log.append(Message::user(&display, attachments.to_vec()));
        surface.set_empty_state(false);
        surface.append_message(
            user_index,
            Role::User,
            &content_renderer::render(Role::User, &display),
        );

        let index = self.append_placeholder(log, surface);
        surface.set_generating(true);

        let request = ChatStreamRequest {
            session_id: session_id.to_string(),
            text: display,
            config: self.config.to_request(self.model.supported_keys.as_ref()),
            attachments: attachments.to_vec(),
        };
        self.start(
            GenerationKind::Send,
            index,
            StreamRequest::Chat(request),
            attachments.to_vec(),
        );

        return Ok(index);
    }

    /// Streams a new reply to the last user turn of an already truncated log.
    pub fn regenerate_from<S: ViewSurface>(
        &mut self,
        log: &mut MessageLog,
        surface: &mut S,
        session_id: &str,
    ) -> Result<usize, Rejection> {
        self.check_ready()?;

        let index = self.append_placeholder(log, surface);
        surface.set_generating(true);

        let request = RegenerateRequest {
            session_id: session_id.to_string(),
            config: self.config.to_request(self.model.supported_keys.as_ref()),
        };
        self.start(
            GenerationKind::Regenerate,
            index,
            StreamRequest::Regenerate(request),
            vec![],
        );

        return Ok(index);
    }

    /// Asks the server to end the active generation. The stream keeps being
    /// read until the server closes it.
    pub async fn stop(&self) -> Result<bool> {
        if self.active.is_none() {
            return Ok(false);
        }

        self.backend.stop_generation().await?;
        return Ok(true);
    }

    fn apply_frame<S: ViewSurface>(
        active: &mut ActiveGeneration,
        event: StreamEvent,
        log: &mut MessageLog,
        surface: &mut S,
    ) {
        match event {
            StreamEvent::Token { text } => {
                if active.error.is_some() {
                    return;
                }

                active.buffer.push_str(&text);
                log.replace_content(active.index, &active.buffer);

                let view = content_renderer::render(Role::Assistant, &active.buffer);
                surface.update_message(active.index, &view);
                if view.activations.any() {
                    surface.activate(active.index, view.activations);
                }
            }
            StreamEvent::Error { message } => {
                surface.update_message(active.index, &content_renderer::failure(&message));
                active.error = Some(message);
            }
            StreamEvent::Done { stats } => {
                if let Some(stats) = stats {
                    if stats.tokens > 0 {
                        surface.append_footer(active.index, &content_renderer::stats_footer(&stats));
                        surface.publish_stats(&stats);
                    }
                }
                active.stats = stats;
            }
        }
    }

    fn close<S: ViewSurface>(
        active: ActiveGeneration,
        transport_error: Option<String>,
        surface: &mut S,
    ) -> GenerationOutcome {
        surface.set_generating(false);

        if let Some(message) = transport_error {
            tracing::warn!(id = active.id, error = %message, "Generation failed");
            surface.update_message(active.index, &content_renderer::failure(&message));
            surface.notify(NoticeLevel::Error, &message);
            let attachments = if active.kind == GenerationKind::Send {
                active.attachments
            } else {
                vec![]
            };

            return GenerationOutcome::TransportFailed {
                kind: active.kind,
                message,
                attachments,
            };
        }

        if let Some(message) = active.error {
            tracing::warn!(id = active.id, error = %message, "Generation reported an error");
            return GenerationOutcome::StreamFailed {
                kind: active.kind,
                message,
            };
        }

        if active.buffer.is_empty() {
            surface.update_message(
                active.index,
                &content_renderer::render(Role::Assistant, &active.buffer),
            );
        }

        tracing::info!(id = active.id, chars = active.buffer.len(), "Generation finished");
        return GenerationOutcome::Finished {
            kind: active.kind,
            stats: active.stats,
        };
    }

    /// Applies one event from a streaming task. Returns the outcome once the
    /// generation has closed and the guard is released.
    pub fn handle_event<S: ViewSurface>(
        &mut self,
        event: Event,
        log: &mut MessageLog,
        surface: &mut S,
    ) -> Option<GenerationOutcome> {
        let event_id = match &event {
            Event::StreamFrame(id, _) => *id,
            Event::StreamClosed(id, _) => *id,
        };
        if self.active.as_ref().map(|active| return active.id) != Some(event_id) {
            tracing::debug!(id = event_id, "Ignoring event from a finished generation");
            return None;
        }

        match event {
            Event::StreamFrame(_, frame) => {
                if let Some(active) = self.active.as_mut() {
                    GenerationController::apply_frame(active, frame, log, surface);
                }
                return None;
            }
            Event::StreamClosed(_, transport_error) => {
                let active = self.active.take()?;
                return Some(GenerationController::close(
                    active,
                    transport_error,
                    surface,
                ));
            }
        }
    }
}

impl Drop for GenerationController {
    fn drop(&mut self) {
        if let Some(active) = self.active.as_ref() {
            active.task.abort();
        }
    }
}
