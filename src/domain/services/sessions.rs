#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;

use std::path::PathBuf;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;

use super::attachments::AttachmentOutcome;
use super::attachments::AttachmentReader;
use super::content_renderer;
use super::generation::GenerationController;
use super::generation::GenerationKind;
use super::generation::GenerationOutcome;
use super::generation::ModelState;
use super::generation::Rejection;
use super::message_log::MessageLog;
use super::stream_consumer::FrameMode;
use crate::domain::models::display_text;
use crate::domain::models::Attachment;
use crate::domain::models::BackendBox;
use crate::domain::models::EditRequest;
use crate::domain::models::Event;
use crate::domain::models::GenerationConfig;
use crate::domain::models::Message;
use crate::domain::models::NoticeLevel;
use crate::domain::models::RetryRequest;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::ViewSurface;

/// Owns the active session and everything shown for it: the message log,
/// the surface, pending attachments and the generation in flight.
pub struct SessionController<S: ViewSurface> {
    backend: BackendBox,
    generation: GenerationController,
    log: MessageLog,
    surface: S,
    sessions: Vec<Session>,
    current: Option<String>,
    pending: Vec<Attachment>,
    reader: AttachmentReader,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl<S: ViewSurface> SessionController<S> {
    pub fn new(
        backend: BackendBox,
        surface: S,
        config: GenerationConfig,
        frame_mode: FrameMode,
        reader: AttachmentReader,
    ) -> SessionController<S> {
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = GenerationController::new(backend.clone(), tx, config, frame_mode);

        return SessionController {
            backend,
            generation,
            log: MessageLog::default(),
            surface,
            sessions: vec![],
            current: None,
            pending: vec![],
            reader,
            rx,
        };
    }

    pub fn log(&self) -> &MessageLog {
        return &self.log;
    }

    pub fn surface(&self) -> &S {
        return &self.surface;
    }

    pub fn surface_mut(&mut self) -> &mut S {
        return &mut self.surface;
    }

    pub fn sessions(&self) -> &[Session] {
        return &self.sessions;
    }

    pub fn current_session_id(&self) -> Option<&str> {
        return self.current.as_deref();
    }

    pub fn current_session(&self) -> Option<&Session> {
        let id = self.current.as_deref()?;
        return self.sessions.iter().find(|session| return session.id == id);
    }

    pub fn pending_attachments(&self) -> &[Attachment] {
        return &self.pending;
    }

    pub fn generation(&self) -> &GenerationController {
        return &self.generation;
    }

    pub fn generation_mut(&mut self) -> &mut GenerationController {
        return &mut self.generation;
    }

    pub fn is_generating(&self) -> bool {
        return self.generation.is_generating();
    }

    fn ensure_idle(&self) -> Result<(), Rejection> {
        if self.generation.is_generating() {
            return Err(Rejection::Busy);
        }

        return Ok(());
    }

    fn session_id(&self) -> Result<String, Rejection> {
        return self.current.clone().ok_or(Rejection::NoSession);
    }

    fn render_session_list(&mut self) {
        self.surface
            .render_sessions(&self.sessions, self.current.as_deref());
    }

    /// Resolves a 1-based position in the session list, or an id.
    pub fn resolve_session(&self, reference: &str) -> Option<String> {
        if let Ok(position) = reference.parse::<usize>() {
            if let Some(session) = position
                .checked_sub(1)
                .and_then(|idx| return self.sessions.get(idx))
            {
                return Some(session.id.to_string());
            }
        }

        return self
            .sessions
            .iter()
            .find(|session| return session.id == reference)
            .map(|session| return session.id.to_string());
    }

    /// Replaces the log and rebuilds every view node from it.
    pub fn render_messages(&mut self, messages: Vec<Message>) {
        self.log.replace_all(messages);
        self.surface.clear_messages();

        if self.log.is_empty() {
            self.surface.set_empty_state(true);
            return;
        }

        self.surface.set_empty_state(false);
        for (index, message) in self.log.messages().iter().enumerate() {
            let view = content_renderer::render(message.role, &message.content);
            self.surface.append_message(index, message.role, &view);
            if view.activations.any() {
                self.surface.activate(index, view.activations);
            }
        }
    }

    async fn load_messages(&mut self, session_id: &str) -> Result<()> {
        let messages = self.backend.list_messages(session_id).await?;
        tracing::debug!(session_id = session_id, count = messages.len(), "Loaded messages");
        self.render_messages(messages);
        return Ok(());
    }

    pub async fn load_sessions(&mut self) -> Result<()> {
        self.ensure_idle()?;

        let list = self.backend.list_sessions().await?;
        self.sessions = list.sessions;
        self.current = list
            .current_session_id
            .filter(|id| return self.sessions.iter().any(|session| return &session.id == id))
            .or_else(|| return self.sessions.first().map(|session| return session.id.to_string()));
        self.render_session_list();

        match self.current.clone() {
            Some(id) => self.load_messages(&id).await?,
            None => self.render_messages(vec![]),
        }

        return Ok(());
    }

    /// Re-reads the session list without touching the log, so titles the
    /// server assigned show up.
    async fn refresh_session_list(&mut self) {
        match self.backend.list_sessions().await {
            Ok(list) => {
                self.sessions = list.sessions;
                self.render_session_list();
            }
            Err(err) => tracing::warn!(error = ?err, "Failed to refresh sessions"),
        }
    }

    pub async fn select_session(&mut self, session_id: &str) -> Result<()> {
        self.ensure_idle()?;
        if self.current.as_deref() == Some(session_id) {
            return Ok(());
        }

        self.backend.select_session(session_id).await?;
        self.load_messages(session_id).await?;
        self.current = Some(session_id.to_string());
        self.pending.clear();
        self.render_session_list();

        tracing::info!(session_id = session_id, "Selected session");
        return Ok(());
    }

    pub async fn create_session(&mut self, temporary: bool) -> Result<Session> {
        self.ensure_idle()?;

        let session = self.backend.create_session(temporary).await?;
        self.backend.select_session(&session.id).await?;

        self.sessions.insert(0, session.clone());
        self.current = Some(session.id.to_string());
        self.pending.clear();
        self.render_messages(vec![]);
        self.render_session_list();

        tracing::info!(session_id = %session.id, temporary = temporary, "Created session");
        return Ok(session);
    }

    pub async fn delete_session(&mut self, session_id: &str) -> Result<()> {
        self.ensure_idle()?;

        let deleted = self.backend.delete_session(session_id).await?;
        self.sessions.retain(|session| return session.id != session_id);

        let was_current = self.current.as_deref() == Some(session_id);
        let next = deleted
            .current_session_id
            .filter(|id| return self.sessions.iter().any(|session| return &session.id == id))
            .or_else(|| {
                if was_current {
                    return self.sessions.first().map(|session| return session.id.to_string());
                }
                return self.current.clone();
            });

        let changed = next != self.current;
        self.current = next;
        if changed || was_current {
            self.pending.clear();
            match self.current.clone() {
                Some(id) => self.load_messages(&id).await?,
                None => self.render_messages(vec![]),
            }
        }
        self.render_session_list();

        tracing::info!(session_id = session_id, "Deleted session");
        return Ok(());
    }

    pub async fn rename_session(&mut self, session_id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            bail!("Session titles cannot be empty");
        }

        self.backend.rename_session(session_id, title).await?;
        if let Some(session) = self
            .sessions
            .iter_mut()
            .find(|session| return session.id == session_id)
        {
            session.title = title.to_string();
        }
        self.render_session_list();

        return Ok(());
    }

    /// Reads files into the pending attachments, notifying once per file.
    /// Returns how many were attached.
    pub async fn attach_files(&mut self, paths: &[PathBuf]) -> usize {
        let outcomes = self.reader.read_all(paths).await;

        let mut attached = 0;
        for outcome in outcomes {
            let level = match outcome {
                AttachmentOutcome::Attached(_) => NoticeLevel::Info,
                AttachmentOutcome::Truncated(_) | AttachmentOutcome::Skipped(_) => {
                    NoticeLevel::Warning
                }
                AttachmentOutcome::Failed { .. } => NoticeLevel::Error,
            };
            self.surface.notify(level, &outcome.message());

            if let Some(attachment) = outcome.attachment() {
                self.pending.push(attachment.clone());
                attached += 1;
            }
        }

        return attached;
    }

    /// Sends `text` with the pending attachments, creating a session first
    /// when none is active. Returns the index of the assistant placeholder.
    pub async fn send(&mut self, text: &str) -> Result<usize> {
        self.generation.check_send(text, &self.pending)?;

        let attachments = std::mem::take(&mut self.pending);
        if self.current.is_none() {
            if let Err(err) = self.create_session(false).await {
                self.pending = attachments;
                return Err(err);
            }
        }

        let session_id = self.session_id()?;
        return match self.generation.send(
            &mut self.log,
            &mut self.surface,
            &session_id,
            text,
            &attachments,
        ) {
            Ok(index) => Ok(index),
            Err(rejection) => {
                self.pending = attachments;
                Err(rejection.into())
            }
        };
    }

    /// Persists new text for user message `index` and drops everything after
    /// it. The caller regenerates once this succeeds.
    pub async fn edit_message(&mut self, index: usize, text: &str) -> Result<()> {
        self.ensure_idle()?;
        let session_id = self.session_id()?;
        let message = self.log.get(index).ok_or(Rejection::NoSuchMessage)?;
        if message.role != Role::User {
            return Err(Rejection::NotUserMessage.into());
        }

        let content = display_text(text, &message.attachments);
        let req = EditRequest {
            index,
            content: content.to_string(),
        };
        self.backend.edit_message(&session_id, req).await?;

        self.log.replace_content(index, &content);
        self.log.truncate(index + 1);
        self.surface.remove_messages_from(index + 1);
        self.surface
            .update_message(index, &content_renderer::render(Role::User, &content));

        tracing::info!(index = index, "Edited message");
        return Ok(());
    }

    /// Edits user message `index` and streams a fresh reply to it. Nothing is
    /// persisted unless a reply can be generated.
    pub async fn edit_and_regenerate(&mut self, index: usize, text: &str) -> Result<usize> {
        self.generation.check_ready()?;
        self.edit_message(index, text).await?;
        return self.regenerate_from_log();
    }

    /// Drops assistant message `index` and everything after it, then streams
    /// a new reply. Returns the index of the new placeholder.
    pub async fn retry_message(&mut self, index: usize) -> Result<usize> {
        self.ensure_idle()?;
        let session_id = self.session_id()?;
        let message = self.log.get(index).ok_or(Rejection::NoSuchMessage)?;
        if message.role != Role::Assistant {
            return Err(Rejection::NotAssistantMessage.into());
        }
        if index == 0 {
            return Err(Rejection::FirstMessage.into());
        }
        self.generation.check_ready()?;

        self.backend
            .retry_message(&session_id, RetryRequest { index })
            .await?;

        self.log.truncate(index);
        self.surface.remove_messages_from(index);

        tracing::info!(index = index, "Retrying message");
        return self.regenerate_from_log();
    }

    /// Regenerates the latest reply. When the log ends on a user message it
    /// is answered as is.
    pub async fn regenerate(&mut self) -> Result<usize> {
        let last = self.log.len().checked_sub(1).ok_or(Rejection::NoSuchMessage)?;
        let role = self
            .log
            .get(last)
            .map(|message| return message.role)
            .ok_or(Rejection::NoSuchMessage)?;

        if role == Role::Assistant {
            return self.retry_message(last).await;
        }

        self.ensure_idle()?;
        return self.regenerate_from_log();
    }

    fn regenerate_from_log(&mut self) -> Result<usize> {
        let session_id = self.session_id()?;
        let index = self
            .generation
            .regenerate_from(&mut self.log, &mut self.surface, &session_id)?;

        return Ok(index);
    }

    pub async fn stop(&mut self) -> Result<bool> {
        let stopped = self.generation.stop().await?;
        if stopped {
            self.surface.notify(NoticeLevel::Info, "Stopping generation");
        }

        return Ok(stopped);
    }

    /// Asks the server which model is loaded and which options it honours.
    pub async fn refresh_model_state(&mut self) -> Result<()> {
        let status = self.backend.model_status().await?;

        let mut supported_keys = None;
        if status.loaded && !status.path.is_empty() {
            supported_keys = match self.backend.supported_keys(&status.path).await {
                Ok(keys) => Some(keys),
                Err(err) => {
                    tracing::warn!(error = ?err, "Failed to read supported options");
                    None
                }
            };
        }

        let reload_required = self.generation.model_state().reload_required;
        self.generation.set_model_state(ModelState {
            loaded: status.loaded,
            reload_required,
            supported_keys,
        });

        tracing::debug!(loaded = status.loaded, path = %status.path, "Model state refreshed");
        return Ok(());
    }

    /// Waits for the next event from a streaming task.
    pub async fn next_event(&mut self) -> Option<Event> {
        return self.rx.recv().await;
    }

    pub async fn handle_event(&mut self, event: Event) -> Option<GenerationOutcome> {
        let outcome = self
            .generation
            .handle_event(event, &mut self.log, &mut self.surface)?;

        match &outcome {
            GenerationOutcome::Finished {
                kind: GenerationKind::Send,
                ..
            } => self.refresh_session_list().await,
            GenerationOutcome::TransportFailed { attachments, .. } if !attachments.is_empty() => {
                let mut restored = attachments.to_vec();
                restored.append(&mut self.pending);
                self.pending = restored;
            }
            _ => {}
        }

        return Some(outcome);
    }

    /// Handles events until the generation in flight has closed.
    pub async fn run_until_idle(&mut self) -> Option<GenerationOutcome> {
        while self.generation.is_generating() {
            let event = self.next_event().await?;
            if let Some(outcome) = self.handle_event(event).await {
                return Some(outcome);
            }
        }

        return None;
    }
}
