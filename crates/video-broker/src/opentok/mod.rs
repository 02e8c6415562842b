//! OpenTok REST binding of `VideoPlatform`.
//!
//! Sessions and archives are managed through the provider's REST API with a
//! project JWT per request; client tokens are minted locally.

mod auth;
mod token;

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode, Url};
use room_registry_core::{ArchiveJob, ArchiveOptions, MediaMode, PlatformError, VideoPlatform};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

pub use auth::{project_jwt, ProjectClaims, AUTH_HEADER};
pub use token::{mint_token, Role, TokenClaims};

/// Session as returned by `POST /session/create`.
#[derive(Debug, Deserialize)]
struct CreatedSession {
    session_id: String,
}

/// Page returned by `GET /v2/project/{key}/archive`.
#[derive(Debug, Deserialize)]
struct ArchiveList {
    #[serde(default)]
    items: Vec<ArchiveJob>,
}

/// OpenTok REST API client.
pub struct OpenTokClient {
    http: HttpClient,
    base_url: Url,
    api_key: String,
    api_secret: String,
    token_ttl: Duration,
}

impl OpenTokClient {
    /// Create a client. `timeout` bounds every request end to end.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        timeout: Duration,
        token_ttl: Duration,
    ) -> Result<Self, PlatformError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PlatformError::Transport(format!("Invalid API URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(PlatformError::Transport(format!(
                "Invalid API URL {}",
                base_url
            )));
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_ttl,
        })
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn project_endpoint(&self, segments: &[&str]) -> Url {
        let mut all = vec!["v2", "project", self.api_key.as_str()];
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }

    /// Attach auth, send, and turn non-success statuses into errors.
    ///
    /// `what` names the addressed resource for `NotFound`.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, PlatformError> {
        let jwt = project_jwt(
            &self.api_key,
            &self.api_secret,
            chrono::Utc::now().timestamp(),
        )?;

        let response = request
            .header(AUTH_HEADER, jwt)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| PlatformError::Transport(format!("Request for {} failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            debug!("{} not found upstream: {}", what, body);
            return Err(PlatformError::NotFound(what.to_string()));
        }

        Err(PlatformError::Upstream {
            status: status.as_u16(),
            message: upstream_message(&body),
        })
    }

    async fn read_archive(response: Response) -> Result<ArchiveJob, PlatformError> {
        response
            .json::<ArchiveJob>()
            .await
            .map_err(|e| PlatformError::Transport(format!("Invalid archive response: {}", e)))
    }
}

/// Check a caller-supplied id before it becomes a URL path segment.
///
/// Empty ids and dot segments (`.`, `..`, or their `%2e` spellings) would be
/// resolved away by the URL parser and address a different endpoint, so they
/// are reported as the missing `what`.
fn path_id<'a>(what: &str, id: &'a str) -> Result<&'a str, PlatformError> {
    let unescaped = id.to_ascii_lowercase().replace("%2e", ".");
    if id.is_empty() || unescaped == "." || unescaped == ".." {
        return Err(PlatformError::NotFound(format!("{} {}", what, id)));
    }
    Ok(id)
}

/// Pull the human-readable message out of a provider error body.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl VideoPlatform for OpenTokClient {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    #[instrument(skip(self))]
    async fn create_session(&self, media_mode: MediaMode) -> Result<String, PlatformError> {
        let p2p = match media_mode {
            MediaMode::Routed => "disabled",
            MediaMode::Relayed => "enabled",
        };

        let request = self
            .http
            .post(self.endpoint(&["session", "create"]))
            .form(&[("p2p.preference", p2p), ("archiveMode", "manual")]);
        let response = self.send(request, "session create").await?;

        let sessions: Vec<CreatedSession> = response
            .json()
            .await
            .map_err(|e| PlatformError::Transport(format!("Invalid session response: {}", e)))?;

        let session = sessions.into_iter().next().ok_or_else(|| {
            PlatformError::Transport("Session create returned no session".to_string())
        })?;
        debug!("Created session {}", session.session_id);
        Ok(session.session_id)
    }

    async fn generate_token(&self, session_id: &str) -> Result<String, PlatformError> {
        let now = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(self.token_ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            session_id,
            role: Role::Publisher,
            create_time: now,
            expire_time: now.saturating_add(ttl),
            nonce: rand::thread_rng().gen(),
        };
        mint_token(&self.api_key, &self.api_secret, &claims)
    }

    #[instrument(skip(self))]
    async fn start_archive(
        &self,
        session_id: &str,
        options: &ArchiveOptions,
    ) -> Result<ArchiveJob, PlatformError> {
        let mut body = json!({ "sessionId": session_id });
        if let Some(name) = &options.name {
            body["name"] = json!(name);
        }

        let request = self.http.post(self.project_endpoint(&["archive"])).json(&body);
        let response = self
            .send(request, &format!("session {}", session_id))
            .await?;
        Self::read_archive(response).await
    }

    #[instrument(skip(self))]
    async fn stop_archive(&self, archive_id: &str) -> Result<ArchiveJob, PlatformError> {
        let archive_id = path_id("archive", archive_id)?;
        let request = self
            .http
            .post(self.project_endpoint(&["archive", archive_id, "stop"]));
        let response = self
            .send(request, &format!("archive {}", archive_id))
            .await?;
        Self::read_archive(response).await
    }

    #[instrument(skip(self))]
    async fn get_archive(&self, archive_id: &str) -> Result<ArchiveJob, PlatformError> {
        let archive_id = path_id("archive", archive_id)?;
        let request = self
            .http
            .get(self.project_endpoint(&["archive", archive_id]));
        let response = self
            .send(request, &format!("archive {}", archive_id))
            .await?;
        Self::read_archive(response).await
    }

    #[instrument(skip(self))]
    async fn list_archives(
        &self,
        offset: u32,
        count: u32,
    ) -> Result<Vec<ArchiveJob>, PlatformError> {
        let request = self
            .http
            .get(self.project_endpoint(&["archive"]))
            .query(&[("offset", offset), ("count", count)]);
        let response = self.send(request, "archive list").await?;

        let list: ArchiveList = response
            .json()
            .await
            .map_err(|e| PlatformError::Transport(format!("Invalid archive list: {}", e)))?;
        Ok(list.items)
    }

    #[instrument(skip(self, data))]
    async fn send_signal(
        &self,
        session_id: &str,
        signal_type: &str,
        data: &str,
    ) -> Result<(), PlatformError> {
        let session_id = path_id("session", session_id)?;
        let request = self
            .http
            .post(self.project_endpoint(&["session", session_id, "signal"]))
            .json(&json!({ "type": signal_type, "data": data }));
        self.send(request, &format!("session {}", session_id))
            .await?;
        Ok(())
    }
}
