#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Backend;
use crate::domain::models::ByteStream;
use crate::domain::models::ChatStreamRequest;
use crate::domain::models::DeletedSession;
use crate::domain::models::EditRequest;
use crate::domain::models::Message;
use crate::domain::models::MessageList;
use crate::domain::models::ModelStatus;
use crate::domain::models::RegenerateRequest;
use crate::domain::models::RetryRequest;
use crate::domain::models::Session;
use crate::domain::models::SessionList;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CreateSessionRequest {
    is_temporary: bool,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RenameSessionRequest {
    title: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ModelConfigResponse {
    #[serde(default)]
    supported_keys: Vec<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: String,
}

/// Fails with the server's `detail` message when the response is not 2xx.
async fn ensure_success(res: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    if res.status().is_success() {
        return Ok(res);
    }

    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| return e.detail)
        .unwrap_or_default();

    tracing::error!(status = status, detail = %detail, "Failed to {action}");
    if detail.is_empty() {
        bail!(format!("Failed to {action} (HTTP {status})"));
    }
    bail!(format!("Failed to {action}: {detail}"));
}

fn into_byte_stream(res: reqwest::Response) -> ByteStream {
    return Box::pin(res.bytes_stream().map_err(anyhow::Error::from));
}

pub struct HttpBackend {
    url: String,
    timeout: String,
}

impl Default for HttpBackend {
    fn default() -> HttpBackend {
        return HttpBackend::new(
            &Config::get(ConfigKey::ServerURL),
            &Config::get(ConfigKey::RequestTimeout),
        );
    }
}

impl HttpBackend {
    pub fn new(url: &str, timeout: &str) -> HttpBackend {
        return HttpBackend {
            url: url.trim_end_matches('/').to_string(),
            timeout: timeout.to_string(),
        };
    }

    fn endpoint(&self, path: &str) -> String {
        return format!("{url}{path}", url = self.url);
    }

    fn timeout(&self) -> Result<Duration> {
        return Ok(Duration::from_millis(self.timeout.parse::<u64>()?));
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        let res = reqwest::Client::new()
            .get(self.endpoint("/api/health"))
            .timeout(self.timeout()?)
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "Chat server is not running");
                bail!(format!("Chat server is not running at {}", self.url));
            }
        };

        if res.status() != 200 {
            tracing::error!(status = res.status().as_u16(), "Chat server health check failed");
            bail!("Chat server health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn list_sessions(&self) -> Result<SessionList> {
        let res = reqwest::Client::new()
            .get(self.endpoint("/api/sessions"))
            .send()
            .await?;

        let list = ensure_success(res, "list sessions")
            .await?
            .json::<SessionList>()
            .await?;

        return Ok(list);
    }

    #[allow(clippy::implicit_return)]
    async fn create_session(&self, temporary: bool) -> Result<Session> {
        let res = reqwest::Client::new()
            .post(self.endpoint("/api/sessions"))
            .json(&CreateSessionRequest {
                is_temporary: temporary,
            })
            .send()
            .await?;

        let mut session = ensure_success(res, "create a session")
            .await?
            .json::<Session>()
            .await?;

        // Older servers leave the flag out of the response.
        session.is_temporary = session.is_temporary || temporary;
        return Ok(session);
    }

    #[allow(clippy::implicit_return)]
    async fn select_session(&self, session_id: &str) -> Result<()> {
        let res = reqwest::Client::new()
            .post(self.endpoint(&format!("/api/sessions/{session_id}/select")))
            .send()
            .await?;

        ensure_success(res, "select the session").await?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn rename_session(&self, session_id: &str, title: &str) -> Result<()> {
        let res = reqwest::Client::new()
            .put(self.endpoint(&format!("/api/sessions/{session_id}")))
            .json(&RenameSessionRequest {
                title: title.to_string(),
            })
            .send()
            .await?;

        ensure_success(res, "rename the session").await?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn delete_session(&self, session_id: &str) -> Result<DeletedSession> {
        let res = reqwest::Client::new()
            .delete(self.endpoint(&format!("/api/sessions/{session_id}")))
            .send()
            .await?;

        let deleted = ensure_success(res, "delete the session")
            .await?
            .json::<DeletedSession>()
            .await?;

        return Ok(deleted);
    }

    #[allow(clippy::implicit_return)]
    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let res = reqwest::Client::new()
            .get(self.endpoint(&format!("/api/sessions/{session_id}/messages")))
            .send()
            .await?;

        let list = ensure_success(res, "load messages")
            .await?
            .json::<MessageList>()
            .await?;

        return Ok(list.into_messages());
    }

    #[allow(clippy::implicit_return)]
    async fn edit_message(&self, session_id: &str, req: EditRequest) -> Result<()> {
        let res = reqwest::Client::new()
            .post(self.endpoint(&format!("/api/sessions/{session_id}/messages/edit")))
            .json(&req)
            .send()
            .await?;

        ensure_success(res, "edit the message").await?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn retry_message(&self, session_id: &str, req: RetryRequest) -> Result<()> {
        let res = reqwest::Client::new()
            .post(self.endpoint(&format!("/api/sessions/{session_id}/messages/retry")))
            .json(&req)
            .send()
            .await?;

        ensure_success(res, "retry the message").await?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn start_chat_stream(&self, req: ChatStreamRequest) -> Result<ByteStream> {
        let res = reqwest::Client::new()
            .post(self.endpoint("/api/chat/stream"))
            .json(&req)
            .send()
            .await?;

        let res = ensure_success(res, "start the chat stream").await?;
        return Ok(into_byte_stream(res));
    }

    #[allow(clippy::implicit_return)]
    async fn regenerate_stream(&self, req: RegenerateRequest) -> Result<ByteStream> {
        let res = reqwest::Client::new()
            .post(self.endpoint("/api/chat/regenerate"))
            .json(&req)
            .send()
            .await?;

        let res = ensure_success(res, "regenerate the reply").await?;
        return Ok(into_byte_stream(res));
    }

    #[allow(clippy::implicit_return)]
    async fn stop_generation(&self) -> Result<()> {
        let res = reqwest::Client::new()
            .post(self.endpoint("/api/chat/stop"))
            .send()
            .await?;

        ensure_success(res, "stop the generation").await?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn model_status(&self) -> Result<ModelStatus> {
        let res = reqwest::Client::new()
            .get(self.endpoint("/api/models/status"))
            .timeout(self.timeout()?)
            .send()
            .await?;

        let status = ensure_success(res, "read the model status")
            .await?
            .json::<ModelStatus>()
            .await?;

        return Ok(status);
    }

    #[allow(clippy::implicit_return)]
    async fn supported_keys(&self, model_path: &str) -> Result<BTreeSet<String>> {
        let res = reqwest::Client::new()
            .get(self.endpoint("/api/models/config"))
            .query(&[("path", model_path)])
            .send()
            .await?;

        let config = ensure_success(res, "read the model config")
            .await?
            .json::<ModelConfigResponse>()
            .await?;

        return Ok(config.supported_keys.into_iter().collect());
    }
}
