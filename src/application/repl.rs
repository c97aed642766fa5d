#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Error;
use anyhow::Result;
use tokio::fs;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::NoticeLevel;
use crate::domain::models::SlashCommand;
use crate::domain::models::ViewSurface;
use crate::domain::services::GenerationOutcome;
use crate::domain::services::Rejection;
use crate::domain::services::SessionController;
use crate::infrastructure::surfaces::ConsoleSurface;

const DEFAULT_TRANSCRIPT: &str = "idlechat-transcript.html";

pub type ConsoleController<W> = SessionController<ConsoleSurface<W>>;

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /new (/n) - Start a new chat session.
- /temp (/t) - Start a temporary chat session.
- /sessions (/s) - List chat sessions. The active one is marked with *.
- /select (/o) [NUMBER or ID] - Switch to another chat session.
- /rename [TITLE] - Rename the active chat session.
- /delete (/d) [NUMBER or ID] - Delete a chat session. Defaults to the active one.
- /edit (/e) [N] [TEXT] - Replace your message N and answer it again.
- /retry (/r) [N] - Discard reply N and everything after it, then answer again.
- /regen - Answer the latest message again.
- /stop - Stop the reply being generated.
- /attach (/a) [PATH...] - Attach files to the next message.
- /history - Print the whole conversation again.
- /export (/x) [PATH] - Save the conversation as an HTML transcript.
- /help (/h) - Provides this help menu.
- /quit /exit (/q) - Exit idlechat.

Messages are numbered from 1, in the order they were sent.
    "#;

    return text.trim().to_string();
}

/// Shows a failed command as a notice. Refusals are warnings, anything else
/// an error. The controller returns these without showing them.
fn report<W: Write>(controller: &mut ConsoleController<W>, err: Error) {
    let (level, text) = match err.downcast_ref::<Rejection>() {
        Some(rejection) => (NoticeLevel::Warning, rejection.to_string()),
        None => (NoticeLevel::Error, err.to_string()),
    };

    tracing::debug!(error = ?err, "Command failed");
    controller.surface_mut().notify(level, &text);
}

fn transcript_title<W: Write>(controller: &ConsoleController<W>) -> String {
    return controller
        .current_session()
        .map(|session| return session.display_title())
        .unwrap_or_else(|| return "idlechat".to_string());
}

/// Writes the conversation as a standalone HTML page.
pub async fn export_transcript<W: Write>(
    controller: &mut ConsoleController<W>,
    path: Option<&str>,
) -> Result<PathBuf> {
    let path = match path {
        Some(path) => PathBuf::from(path),
        None => {
            let configured = Config::get(ConfigKey::Transcript);
            if configured.is_empty() {
                PathBuf::from(DEFAULT_TRANSCRIPT)
            } else {
                PathBuf::from(configured)
            }
        }
    };

    let document = controller
        .surface()
        .html()
        .render_document(&transcript_title(controller));
    fs::write(&path, document).await?;

    return Ok(path);
}

async fn run_command<W: Write>(
    controller: &mut ConsoleController<W>,
    cmd: SlashCommand,
) -> Result<Flow> {
    if cmd.is_quit() {
        return Ok(Flow::Quit);
    }

    if cmd.is_help() {
        controller
            .surface_mut()
            .notify(NoticeLevel::Info, &help_text());
    } else if cmd.is_new_session() {
        controller.create_session(false).await?;
    } else if cmd.is_temp_session() {
        controller.create_session(true).await?;
    } else if cmd.is_session_list() {
        let sessions = controller.sessions().to_vec();
        let current = controller.current_session_id().map(|id| return id.to_string());
        controller
            .surface_mut()
            .render_sessions(&sessions, current.as_deref());
    } else if cmd.is_select_session() {
        match controller.resolve_session(&cmd.args[0]) {
            Some(session_id) => controller.select_session(&session_id).await?,
            None => controller.surface_mut().notify(
                NoticeLevel::Warning,
                &format!("No session matches '{}'", cmd.args[0]),
            ),
        }
    } else if cmd.is_rename_session() {
        let session_id = controller.current_session_id().map(|id| return id.to_string());
        match session_id {
            Some(session_id) => controller.rename_session(&session_id, &cmd.rest(0)).await?,
            None => return Err(Rejection::NoSession.into()),
        }
    } else if cmd.is_delete_session() {
        let session_id = match cmd.args.first() {
            Some(reference) => controller.resolve_session(reference),
            None => controller.current_session_id().map(|id| return id.to_string()),
        };
        match session_id {
            Some(session_id) => controller.delete_session(&session_id).await?,
            None => controller
                .surface_mut()
                .notify(NoticeLevel::Warning, "No session to delete"),
        }
    } else if cmd.is_edit() {
        let index = cmd.index_arg().ok_or(Rejection::NoSuchMessage)?;
        controller.edit_and_regenerate(index, &cmd.rest(1)).await?;
    } else if cmd.is_retry() {
        let index = cmd.index_arg().ok_or(Rejection::NoSuchMessage)?;
        controller.retry_message(index).await?;
    } else if cmd.is_regenerate() {
        controller.regenerate().await?;
    } else if cmd.is_stop() {
        if !controller.stop().await? {
            controller
                .surface_mut()
                .notify(NoticeLevel::Info, "Nothing is being generated");
        }
    } else if cmd.is_attach() {
        let paths = cmd
            .args
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<PathBuf>>();
        controller.attach_files(&paths).await;
    } else if cmd.is_history() {
        let messages = controller.log().messages().to_vec();
        controller.render_messages(messages);
    } else if cmd.is_export() {
        let path = export_transcript(controller, cmd.args.first().map(|e| return e.as_str())).await?;
        controller.surface_mut().notify(
            NoticeLevel::Info,
            &format!("Saved transcript to {}", path.to_string_lossy()),
        );
    }

    return Ok(Flow::Continue);
}

/// Runs one line of input: a slash command, or a message to send.
pub async fn dispatch<W: Write>(controller: &mut ConsoleController<W>, line: &str) -> Flow {
    let res = match SlashCommand::parse(line) {
        Some(cmd) => run_command(controller, cmd).await,
        None => controller.send(line).await.map(|_| return Flow::Continue),
    };

    return match res {
        Ok(flow) => flow,
        Err(err) => {
            report(controller, err);
            Flow::Continue
        }
    };
}

fn after_outcome<W: Write>(controller: &mut ConsoleController<W>, outcome: GenerationOutcome) {
    if let GenerationOutcome::TransportFailed { attachments, .. } = outcome {
        if !attachments.is_empty() {
            let text = format!(
                "{} attachment(s) kept for the next message",
                controller.pending_attachments().len()
            );
            controller.surface_mut().notify(NoticeLevel::Info, &text);
        }
    }
}

/// Connects to the server and restores the configured or current session.
pub async fn prepare<W: Write>(controller: &mut ConsoleController<W>) -> Result<()> {
    if let Err(err) = controller.refresh_model_state().await {
        tracing::warn!(error = ?err, "Failed to read the model status");
    }
    controller.load_sessions().await?;

    let session_id = Config::get(ConfigKey::SessionID);
    if !session_id.is_empty() {
        match controller.resolve_session(&session_id) {
            Some(session_id) => controller.select_session(&session_id).await?,
            None => controller.surface_mut().notify(
                NoticeLevel::Warning,
                &format!("Session {session_id} was not found"),
            ),
        }
    }

    return Ok(());
}

/// Reads stdin line by line while streamed replies are handled as they
/// arrive.
pub async fn start<W: Write>(mut controller: ConsoleController<W>) -> Result<()> {
    prepare(&mut controller).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                if dispatch(&mut controller, &line).await == Flow::Quit {
                    break;
                }
            }
            Some(event) = controller.next_event() => {
                if let Some(outcome) = controller.handle_event(event).await {
                    after_outcome(&mut controller, outcome);
                }
            }
        }
    }

    if controller.is_generating() {
        controller.stop().await?;
        controller.run_until_idle().await;
    }

    if !Config::get(ConfigKey::Transcript).is_empty() {
        let path = export_transcript(&mut controller, None).await?;
        tracing::info!(path = %path.to_string_lossy(), "Saved transcript");
    }

    return Ok(());
}
