//! Recording lifecycle operations proxied to the video platform.

use std::sync::Arc;

use room_registry_core::{ArchiveJob, ArchiveOptions, VideoPlatform};
use tracing::{debug, info, instrument};

use crate::error::{BrokerError, Result};

/// Listing page size used when the caller gives none (or garbage).
pub const DEFAULT_LIST_COUNT: u32 = 1000;

/// Paging for archive listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub offset: u32,
    pub count: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            offset: 0,
            count: DEFAULT_LIST_COUNT,
        }
    }
}

impl ListParams {
    /// Build from raw query values.
    ///
    /// Missing, non-numeric, or negative `offset` becomes 0. Missing, non-numeric,
    /// or zero `count` becomes `DEFAULT_LIST_COUNT`.
    pub fn from_raw(offset: Option<&str>, count: Option<&str>) -> Self {
        let offset = offset
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let count = count
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_LIST_COUNT);
        Self { offset, count }
    }
}

/// What to show a viewer asking for a recording.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewResult {
    /// The recording is ready; send the viewer here.
    Redirect(String),
    /// Still recording or processing; show a placeholder and let the viewer reload.
    Pending(ArchiveJob),
}

pub struct ArchiveController {
    platform: Arc<dyn VideoPlatform>,
    default_name: String,
    max_count: Option<u32>,
}

impl ArchiveController {
    pub fn new(
        platform: Arc<dyn VideoPlatform>,
        default_name: impl Into<String>,
        max_count: Option<u32>,
    ) -> Self {
        Self {
            platform,
            default_name: default_name.into(),
            max_count,
        }
    }

    /// Start recording a session. `name` falls back to the configured archive name.
    #[instrument(skip(self))]
    pub async fn start(&self, session_id: &str, name: Option<&str>) -> Result<ArchiveJob> {
        if session_id.trim().is_empty() {
            return Err(BrokerError::InvalidRequest(
                "sessionId is required".to_string(),
            ));
        }

        let options = ArchiveOptions {
            name: Some(name.unwrap_or(&self.default_name).to_string()),
        };
        let job = self.platform.start_archive(session_id, &options).await?;
        info!(
            "Started archive {} for session {} ({:?})",
            job.archive_id, session_id, job.status
        );
        Ok(job)
    }

    #[instrument(skip(self))]
    pub async fn stop(&self, archive_id: &str) -> Result<ArchiveJob> {
        let job = self.platform.stop_archive(archive_id).await?;
        info!("Stopped archive {} ({:?})", archive_id, job.status);
        Ok(job)
    }

    pub async fn get(&self, archive_id: &str) -> Result<ArchiveJob> {
        Ok(self.platform.get_archive(archive_id).await?)
    }

    pub async fn list(&self, params: ListParams) -> Result<Vec<ArchiveJob>> {
        let count = match self.max_count {
            Some(max) => params.count.min(max),
            None => params.count,
        };
        let archives = self.platform.list_archives(params.offset, count).await?;
        debug!(
            "Listed {} archives (offset {}, count {})",
            archives.len(),
            params.offset,
            count
        );
        Ok(archives)
    }

    /// Decide between redirecting to the recording and showing the pending page.
    ///
    /// Only lookup failures are errors; any status other than `available` is `Pending`.
    #[instrument(skip(self))]
    pub async fn resolve_view(&self, archive_id: &str) -> Result<ViewResult> {
        let job = self.get(archive_id).await?;
        match job.playable_url() {
            Some(url) => Ok(ViewResult::Redirect(url.to_string())),
            None => {
                debug!(
                    "Archive {} not playable yet ({:?})",
                    archive_id, job.status
                );
                Ok(ViewResult::Pending(job))
            }
        }
    }
}
