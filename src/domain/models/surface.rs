use super::GenerationStats;
use super::Role;
use super::Session;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Ready,
    Failed,
}

/// Which client-side renderers a node needs once its markup is in place.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Activations {
    pub diagrams: bool,
    pub math: bool,
}

impl Activations {
    pub fn any(&self) -> bool {
        return self.diagrams || self.math;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeView {
    pub state: NodeState,
    /// Raw text the markup was rendered from.
    pub source: String,
    pub markup: String,
    pub activations: Activations,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Rendering target every log mutation is mirrored into. Message nodes are
/// addressed by their log index.
pub trait ViewSurface {
    fn clear_messages(&mut self);

    fn set_empty_state(&mut self, empty: bool);

    fn append_message(&mut self, index: usize, role: Role, view: &NodeView);

    fn update_message(&mut self, index: usize, view: &NodeView);

    fn append_footer(&mut self, index: usize, markup: &str);

    /// Detaches every node at `keep` or later.
    fn remove_messages_from(&mut self, keep: usize);

    /// Runs diagram and math renderers scoped to one node.
    fn activate(&mut self, index: usize, activations: Activations);

    fn set_generating(&mut self, generating: bool);

    fn notify(&mut self, level: NoticeLevel, text: &str);

    fn publish_stats(&mut self, stats: &GenerationStats);

    fn render_sessions(&mut self, sessions: &[Session], current: Option<&str>);
}
