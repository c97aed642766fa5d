use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub time: f64,
}

/// One decoded frame of a generation stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Token {
        #[serde(rename = "token", default)]
        text: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    Done {
        #[serde(default)]
        stats: Option<GenerationStats>,
    },
}
