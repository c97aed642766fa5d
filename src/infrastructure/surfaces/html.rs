#[cfg(test)]
#[path = "html_test.rs"]
mod tests;

use std::collections::BTreeMap;

use crate::domain::models::Activations;
use crate::domain::models::GenerationStats;
use crate::domain::models::NodeState;
use crate::domain::models::NodeView;
use crate::domain::models::NoticeLevel;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::ViewSurface;
use crate::domain::services::escape;

const EMPTY_STATE_MARKUP: &str =
    "<div class=\"empty-state\">Start a conversation by typing a message below.</div>";

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedNode {
    pub role: Role,
    pub view: NodeView,
    pub footers: Vec<String>,
}

/// Keeps the rendered transcript in memory and writes it out as a standalone
/// HTML document.
#[derive(Default)]
pub struct HtmlSurface {
    nodes: BTreeMap<usize, RenderedNode>,
    pub empty_state: bool,
    pub generating: bool,
    pub notices: Vec<(NoticeLevel, String)>,
    pub stats: Option<GenerationStats>,
    pub sessions: Vec<Session>,
    pub current_session: Option<String>,
    pub activations: Vec<(usize, Activations)>,
}

impl HtmlSurface {
    pub fn node(&self, index: usize) -> Option<&RenderedNode> {
        return self.nodes.get(&index);
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&usize, &RenderedNode)> {
        return self.nodes.iter();
    }

    pub fn len(&self) -> usize {
        return self.nodes.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.nodes.is_empty();
    }

    pub fn last_notice(&self) -> Option<&(NoticeLevel, String)> {
        return self.notices.last();
    }

    fn node_markup(index: usize, node: &RenderedNode) -> String {
        let state = match node.view.state {
            NodeState::Pending => " pending",
            NodeState::Ready => "",
            NodeState::Failed => " failed",
        };

        return format!(
            "<div class=\"message {role}{state}\" data-index=\"{index}\"><div class=\"message-content\">{markup}</div>{footers}</div>",
            role = node.role,
            markup = node.view.markup,
            footers = node.footers.join("")
        );
    }

    /// Markup of the message list as it currently stands.
    pub fn render_body(&self) -> String {
        if self.nodes.is_empty() && self.empty_state {
            return EMPTY_STATE_MARKUP.to_string();
        }

        return self
            .nodes
            .iter()
            .map(|(index, node)| return HtmlSurface::node_markup(*index, node))
            .collect::<Vec<String>>()
            .join("\n");
    }

    pub fn render_document(&self, title: &str) -> String {
        return format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<div id=\"chat-messages\">\n{body}\n</div>\n</body>\n</html>\n",
            title = escape(title),
            body = self.render_body()
        );
    }
}

impl ViewSurface for HtmlSurface {
    fn clear_messages(&mut self) {
        self.nodes.clear();
    }

    fn set_empty_state(&mut self, empty: bool) {
        self.empty_state = empty;
    }

    fn append_message(&mut self, index: usize, role: Role, view: &NodeView) {
        self.nodes.insert(
            index,
            RenderedNode {
                role,
                view: view.clone(),
                footers: vec![],
            },
        );
    }

    fn update_message(&mut self, index: usize, view: &NodeView) {
        match self.nodes.get_mut(&index) {
            Some(node) => node.view = view.clone(),
            None => tracing::debug!(index = index, "Update for a detached node"),
        }
    }

    fn append_footer(&mut self, index: usize, markup: &str) {
        if let Some(node) = self.nodes.get_mut(&index) {
            node.footers.push(markup.to_string());
        }
    }

    fn remove_messages_from(&mut self, keep: usize) {
        self.nodes.split_off(&keep);
    }

    fn activate(&mut self, index: usize, activations: Activations) {
        self.activations.push((index, activations));
    }

    fn set_generating(&mut self, generating: bool) {
        self.generating = generating;
    }

    fn notify(&mut self, level: NoticeLevel, text: &str) {
        self.notices.push((level, text.to_string()));
    }

    fn publish_stats(&mut self, stats: &GenerationStats) {
        self.stats = Some(*stats);
    }

    fn render_sessions(&mut self, sessions: &[Session], current: Option<&str>) {
        self.sessions = sessions.to_vec();
        self.current_session = current.map(|id| return id.to_string());
    }
}
