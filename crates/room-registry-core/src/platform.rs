use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveJob, ArchiveOptions};
use crate::error::PlatformError;

/// How media streams travel between participants of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    /// Streams go through the provider's media router. Required for archiving.
    #[default]
    Routed,
    /// Clients stream peer-to-peer when possible.
    Relayed,
}

impl fmt::Display for MediaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaMode::Routed => f.write_str("routed"),
            MediaMode::Relayed => f.write_str("relayed"),
        }
    }
}

impl FromStr for MediaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "routed" => Ok(MediaMode::Routed),
            "relayed" => Ok(MediaMode::Relayed),
            other => Err(format!(
                "unknown media mode '{}', expected 'routed' or 'relayed'",
                other
            )),
        }
    }
}

/// The upstream video platform, reduced to the operations the broker needs.
///
/// Concrete bindings include the OpenTok REST client and an in-memory double for tests.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Publishable identifier of the account issuing sessions and tokens.
    fn api_key(&self) -> &str;

    /// Create a new session and return its id.
    async fn create_session(&self, media_mode: MediaMode) -> Result<String, PlatformError>;

    /// Mint a short-lived token for joining a session.
    async fn generate_token(&self, session_id: &str) -> Result<String, PlatformError>;

    /// Start recording a session.
    async fn start_archive(
        &self,
        session_id: &str,
        options: &ArchiveOptions,
    ) -> Result<ArchiveJob, PlatformError>;

    /// Stop a running recording.
    async fn stop_archive(&self, archive_id: &str) -> Result<ArchiveJob, PlatformError>;

    /// Fetch a recording's current status and metadata.
    async fn get_archive(&self, archive_id: &str) -> Result<ArchiveJob, PlatformError>;

    /// List recordings, newest first.
    async fn list_archives(&self, offset: u32, count: u32)
        -> Result<Vec<ArchiveJob>, PlatformError>;

    /// Send a signal to every client connected to a session.
    async fn send_signal(
        &self,
        session_id: &str,
        signal_type: &str,
        data: &str,
    ) -> Result<(), PlatformError>;
}
