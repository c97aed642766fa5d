use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_SESSION_TITLE: &str = "New Chat";
pub const TEMPORARY_SESSION_TITLE: &str = "Temp Chat";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_temporary: bool,
}

impl Session {
    pub fn display_title(&self) -> String {
        let title = self.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }

        if self.is_temporary {
            return TEMPORARY_SESSION_TITLE.to_string();
        }

        return DEFAULT_SESSION_TITLE.to_string();
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub current_session_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeletedSession {
    #[serde(default)]
    pub current_session_id: Option<String>,
}
