//! HTTP handlers.
//!
//! Implements:
//! - GET /room/{name} - Resolve a room and mint a token
//! - GET /join/{name} - Join page for an existing room
//! - /archive/... - Recording lifecycle
//! - POST /signal, POST /events/{type} - Signalling and provider callbacks
//! - GET /, GET /session, GET /health

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use room_registry_core::ArchiveJob;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::archive::{ListParams, ViewResult};
use crate::error::{BrokerError, Result};
use crate::state::AppState;
use crate::token::AccessToken;

const HOME_TEMPLATE: &str = include_str!("../templates/home.html");
const JOIN_TEMPLATE: &str = include_str!("../templates/join.html");
const VIEW_TEMPLATE: &str = include_str!("../templates/view.html");

/// Signal type used for server-originated signals.
pub const SERVER_SIGNAL_TYPE: &str = "from-server";

/// Events are appended to this file inside the configured directory.
pub const EVENTS_FILE: &str = "events.txt";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListArchivesQuery {
    pub offset: Option<String>,
    pub count: Option<String>,
}

/// Health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub store_backend: &'static str,
}

/// Parse a JSON body regardless of the request's content type.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| BrokerError::InvalidRequest(format!("Invalid JSON body: {}", e)))
}

fn require_session_id(request: &SessionRequest) -> Result<&str> {
    request
        .session_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| BrokerError::InvalidRequest("sessionId is required".to_string()))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Replace `{{ key }}` placeholders with HTML-escaped values.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |page, (key, value)| {
        page.replace(&format!("{{{{ {} }}}}", key), &escape_html(value))
    })
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// GET / - Endpoint overview.
pub async fn index_handler() -> Html<&'static str> {
    Html(HOME_TEMPLATE)
}

/// GET /health - Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        store_backend: state.resolver.store().backend_name(),
    })
}

/// GET /session - Shortcut to the default room.
pub async fn session_handler() -> Response {
    found("/room/session")
}

/// GET /room/{name} - Session id for the room (created on first use) plus a fresh token.
pub async fn room_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AccessToken>> {
    let room = state.resolver.resolve(&name).await?;
    if room.created {
        info!("Room {} opened with session {}", name, room.session_id);
    }
    let token = state.tokens.issue(&room.session_id).await?;
    Ok(Json(token))
}

/// GET /join/{name} - Join page for a room that already exists.
pub async fn join_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let Some(session_id) = state.resolver.lookup(&name).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Html("<h1>404 Not Found</h1>The room you requested was not found"),
        )
            .into_response());
    };

    let token = state.tokens.issue(&session_id).await?;
    let page = render(
        JOIN_TEMPLATE,
        &[
            ("apiKey", &token.api_key),
            ("sessionId", &token.session_id),
            ("token", &token.token),
        ],
    );
    Ok(Html(page).into_response())
}

/// POST /archive/start - Start recording the session named in the body.
pub async fn start_archive_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ArchiveJob>> {
    let request: SessionRequest = parse_body(&body)?;
    let session_id = require_session_id(&request)?;
    let job = state
        .archives
        .start(session_id, request.name.as_deref())
        .await?;
    Ok(Json(job))
}

/// POST /archive/{archive_id}/stop
pub async fn stop_archive_handler(
    State(state): State<AppState>,
    Path(archive_id): Path<String>,
) -> Result<Json<ArchiveJob>> {
    Ok(Json(state.archives.stop(&archive_id).await?))
}

/// GET /archive/{archive_id}
pub async fn get_archive_handler(
    State(state): State<AppState>,
    Path(archive_id): Path<String>,
) -> Result<Json<ArchiveJob>> {
    Ok(Json(state.archives.get(&archive_id).await?))
}

/// GET /archive?offset=&count=
pub async fn list_archives_handler(
    State(state): State<AppState>,
    Query(query): Query<ListArchivesQuery>,
) -> Result<Json<Vec<ArchiveJob>>> {
    let params = ListParams::from_raw(query.offset.as_deref(), query.count.as_deref());
    Ok(Json(state.archives.list(params).await?))
}

/// GET|POST /archive/{archive_id}/view - Redirect to the recording, or a placeholder while it is processed.
pub async fn view_archive_handler(
    State(state): State<AppState>,
    Path(archive_id): Path<String>,
) -> Response {
    match state.archives.resolve_view(&archive_id).await {
        Ok(ViewResult::Redirect(url)) => found(&url),
        Ok(ViewResult::Pending(job)) => {
            let status = serde_json::to_value(job.status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            Html(render(
                VIEW_TEMPLATE,
                &[("archiveId", &job.archive_id), ("status", &status)],
            ))
            .into_response()
        }
        Err(e) => {
            let title = match &e {
                BrokerError::Internal(_) => "Unknown Error",
                _ => "Error",
            };
            (
                e.status_code(),
                Html(format!("<h1>{}</h1>{}", title, escape_html(&e.to_string()))),
            )
                .into_response()
        }
    }
}

/// POST /signal - Send a server signal to everyone in the session.
pub async fn signal_handler(State(state): State<AppState>, body: Bytes) -> Result<StatusCode> {
    let request: SessionRequest = parse_body(&body)?;
    let session_id = require_session_id(&request)?;

    let data = format!(
        "Signal from server at {}",
        chrono::Local::now().format("%A %e %B %Y %I:%M:%S %p")
    );
    state
        .platform
        .send_signal(session_id, SERVER_SIGNAL_TYPE, &data)
        .await?;

    info!("Sent {} signal to session {}", SERVER_SIGNAL_TYPE, session_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /events/{event_type} - Provider callback sink.
pub async fn events_handler(
    State(state): State<AppState>,
    Path(event_type): Path<String>,
    body: String,
) -> StatusCode {
    info!(event_type = %event_type, bytes = body.len(), "Received provider event");

    if let Some(dir) = &state.events_log_dir {
        let path = dir.join(EVENTS_FILE);
        let line = format!("{}---{}\n", event_type, body);
        let result = async {
            tokio::fs::create_dir_all(dir).await?;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(line.as_bytes()).await
        }
        .await;

        if let Err(e) = result {
            warn!("Failed to append event to {}: {}", path.display(), e);
        }
    }

    StatusCode::NO_CONTENT
}
