#[cfg(test)]
#[path = "console_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::io::Write;

use yansi::Paint;

use super::html::HtmlSurface;
use crate::domain::models::Activations;
use crate::domain::models::GenerationStats;
use crate::domain::models::NodeState;
use crate::domain::models::NodeView;
use crate::domain::models::NoticeLevel;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::ViewSurface;
use crate::domain::services::content_renderer;

/// Prints the conversation as plain text while it streams. Rendered markup
/// is still kept so the transcript can be exported.
pub struct ConsoleSurface<W: Write> {
    html: HtmlSurface,
    printed: BTreeMap<usize, String>,
    out: W,
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W) -> ConsoleSurface<W> {
        return ConsoleSurface {
            html: HtmlSurface::default(),
            printed: BTreeMap::new(),
            out,
        };
    }

    pub fn html(&self) -> &HtmlSurface {
        return &self.html;
    }

    pub fn writer(&self) -> &W {
        return &self.out;
    }

    fn emit(&mut self, text: &str) {
        let res = write!(self.out, "{text}").and_then(|_| return self.out.flush());
        if let Err(err) = res {
            tracing::error!(error = ?err, "Failed to write to the console");
        }
    }

    fn header(role: Role) -> String {
        return match role {
            Role::User => Paint::cyan("you").bold().to_string(),
            Role::Assistant => Paint::green("assistant").bold().to_string(),
        };
    }

    /// Prints whatever part of the node's text has not been shown yet.
    fn print_source(&mut self, index: usize, view: &NodeView) {
        let printed = self.printed.entry(index).or_default();
        let delta = match view.source.strip_prefix(printed.as_str()) {
            Some(rest) => rest.to_string(),
            None => format!("\n{}", view.source),
        };
        *printed = view.source.clone();

        if !delta.is_empty() {
            self.emit(&delta);
        }
    }
}

impl<W: Write> ViewSurface for ConsoleSurface<W> {
    fn clear_messages(&mut self) {
        self.html.clear_messages();
        self.printed.clear();
    }

    fn set_empty_state(&mut self, empty: bool) {
        if empty && !self.html.empty_state {
            let text = Paint::new("Start a conversation by typing a message below.")
                .dimmed()
                .to_string();
            self.emit(&format!("{text}\n"));
        }
        self.html.set_empty_state(empty);
    }

    fn append_message(&mut self, index: usize, role: Role, view: &NodeView) {
        self.html.append_message(index, role, view);
        self.emit(&format!("\n{}\n", ConsoleSurface::<W>::header(role)));

        match view.state {
            NodeState::Pending => {
                self.printed.insert(index, "".to_string());
            }
            NodeState::Ready => {
                self.print_source(index, view);
                if role == Role::User {
                    self.emit("\n");
                }
            }
            NodeState::Failed => self.update_message(index, view),
        }
    }

    fn update_message(&mut self, index: usize, view: &NodeView) {
        self.html.update_message(index, view);

        match view.state {
            NodeState::Pending => {}
            NodeState::Ready => self.print_source(index, view),
            NodeState::Failed => {
                let text = Paint::red(format!("Error: {}", view.source)).to_string();
                self.emit(&format!("\n{text}\n"));
            }
        }
    }

    fn append_footer(&mut self, index: usize, markup: &str) {
        self.html.append_footer(index, markup);
    }

    fn remove_messages_from(&mut self, keep: usize) {
        self.html.remove_messages_from(keep);
        self.printed.split_off(&keep);
    }

    fn activate(&mut self, index: usize, activations: Activations) {
        self.html.activate(index, activations);
    }

    fn set_generating(&mut self, generating: bool) {
        if self.html.generating && !generating {
            self.emit("\n");
        }
        self.html.set_generating(generating);
    }

    fn notify(&mut self, level: NoticeLevel, text: &str) {
        self.html.notify(level, text);

        let line = match level {
            NoticeLevel::Info => text.to_string(),
            NoticeLevel::Warning => Paint::yellow(text).to_string(),
            NoticeLevel::Error => Paint::red(text).to_string(),
        };
        self.emit(&format!("{line}\n"));
    }

    fn publish_stats(&mut self, stats: &GenerationStats) {
        self.html.publish_stats(stats);

        let text = Paint::new(content_renderer::format_stats(stats))
            .dimmed()
            .to_string();
        self.emit(&format!("\n{text}"));
    }

    fn render_sessions(&mut self, sessions: &[Session], current: Option<&str>) {
        self.html.render_sessions(sessions, current);

        let mut lines = vec![];
        for (position, session) in sessions.iter().enumerate() {
            let marker = if Some(session.id.as_str()) == current {
                "*"
            } else {
                " "
            };
            let title = session.display_title();
            let title = if session.is_temporary {
                Paint::new(title).italic().to_string()
            } else {
                title
            };
            lines.push(format!("{marker} {}. {title}", position + 1));
        }

        if lines.is_empty() {
            lines.push("No chat sessions yet.".to_string());
        }
        self.emit(&format!("{}\n", lines.join("\n")));
    }
}
