use serde::{Deserialize, Serialize};

/// Recording status, owned by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveStatus {
    Starting,
    Started,
    Paused,
    Stopped,
    Available,
    Failed,
    Expired,
    Uploaded,
    Deleted,
    /// A status this build does not know about yet.
    #[serde(other)]
    Unknown,
}

/// A server-side recording job tied to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveJob {
    #[serde(rename = "id")]
    pub archive_id: String,
    pub session_id: String,
    pub status: ArchiveStatus,
    #[serde(default)]
    pub name: Option<String>,
    /// Creation time in milliseconds since the epoch.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<u64>,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub has_audio: Option<bool>,
    #[serde(default)]
    pub has_video: Option<bool>,
    #[serde(default)]
    pub output_mode: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Download location, only set once the recording is available.
    #[serde(default)]
    pub url: Option<String>,
}

impl ArchiveJob {
    /// The location to redirect a viewer to, if the recording can be served.
    ///
    /// `None` unless the status is `available` and a non-empty url is present.
    pub fn playable_url(&self) -> Option<&str> {
        if self.status != ArchiveStatus::Available {
            return None;
        }
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Options for starting a recording.
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    pub name: Option<String>,
}
