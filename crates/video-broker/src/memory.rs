//! In-memory `VideoPlatform` used by tests and local demos.
//!
//! Behaves like the provider where the broker cares: archives move through
//! started -> stopped, a session can only be recorded once at a time, and
//! unknown archives are `NotFound`. Failures can be scripted per call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use room_registry_core::{
    ArchiveJob, ArchiveOptions, ArchiveStatus, MediaMode, PlatformError, VideoPlatform,
};

/// A signal recorded by `send_signal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSignal {
    pub session_id: String,
    pub signal_type: String,
    pub data: String,
}

#[derive(Default)]
struct State {
    sessions: HashMap<String, MediaMode>,
    /// Oldest first.
    archives: Vec<ArchiveJob>,
    signals: Vec<SentSignal>,
    last_list: Option<(u32, u32)>,
    create_delay: Duration,
    fail_create: Option<String>,
    fail_token: Option<String>,
    fail_transport: Option<String>,
}

pub struct MemoryPlatform {
    api_key: String,
    sessions_created: AtomicUsize,
    state: Mutex<State>,
}

impl MemoryPlatform {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            sessions_created: AtomicUsize::new(0),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of successful `create_session` calls.
    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub fn session_media_mode(&self, session_id: &str) -> Option<MediaMode> {
        self.state().sessions.get(session_id).copied()
    }

    /// Delay every `create_session`, widening race windows in tests.
    pub fn set_create_delay(&self, delay: Duration) {
        self.state().create_delay = delay;
    }

    /// Make the next `create_session` fail with a 503.
    pub fn fail_next_create(&self, message: &str) {
        self.state().fail_create = Some(message.to_string());
    }

    /// Make the next `generate_token` fail.
    pub fn fail_next_token(&self, message: &str) {
        self.state().fail_token = Some(message.to_string());
    }

    /// Make the next archive or signal call fail as if the provider were unreachable.
    pub fn fail_next_call_with_transport(&self, message: &str) {
        self.state().fail_transport = Some(message.to_string());
    }

    /// Force an archive's status and url, as the provider would while processing.
    pub fn set_archive_state(&self, archive_id: &str, status: ArchiveStatus, url: Option<&str>) {
        let mut state = self.state();
        if let Some(job) = state
            .archives
            .iter_mut()
            .find(|job| job.archive_id == archive_id)
        {
            job.status = status;
            job.url = url.map(str::to_string);
        }
    }

    /// The (offset, count) of the most recent `list_archives` call.
    pub fn last_list_request(&self) -> Option<(u32, u32)> {
        self.state().last_list
    }

    pub fn signals(&self) -> Vec<SentSignal> {
        self.state().signals.clone()
    }

    fn check_transport(state: &mut State) -> Result<(), PlatformError> {
        match state.fail_transport.take() {
            Some(message) => Err(PlatformError::Transport(message)),
            None => Ok(()),
        }
    }
}

fn is_recording(status: ArchiveStatus) -> bool {
    matches!(
        status,
        ArchiveStatus::Starting | ArchiveStatus::Started | ArchiveStatus::Paused
    )
}

#[async_trait]
impl VideoPlatform for MemoryPlatform {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    async fn create_session(&self, media_mode: MediaMode) -> Result<String, PlatformError> {
        let delay = {
            let mut state = self.state();
            if let Some(message) = state.fail_create.take() {
                return Err(PlatformError::Upstream {
                    status: 503,
                    message,
                });
            }
            state.create_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let session_id = format!("1_MX4{}fg", uuid::Uuid::new_v4().simple());
        self.state().sessions.insert(session_id.clone(), media_mode);
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(session_id)
    }

    async fn generate_token(&self, session_id: &str) -> Result<String, PlatformError> {
        if let Some(message) = self.state().fail_token.take() {
            return Err(PlatformError::Token(message));
        }
        Ok(format!(
            "T1==memory-{}-{}",
            session_id,
            uuid::Uuid::new_v4().simple()
        ))
    }

    async fn start_archive(
        &self,
        session_id: &str,
        options: &ArchiveOptions,
    ) -> Result<ArchiveJob, PlatformError> {
        let mut state = self.state();
        Self::check_transport(&mut state)?;

        if state
            .archives
            .iter()
            .any(|job| job.session_id == session_id && is_recording(job.status))
        {
            return Err(PlatformError::Upstream {
                status: 409,
                message: "Session is already being recorded".to_string(),
            });
        }

        let job = ArchiveJob {
            archive_id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            status: ArchiveStatus::Started,
            name: options.name.clone(),
            created_at: Some(chrono::Utc::now().timestamp_millis()),
            duration: Some(0),
            size: Some(0),
            has_audio: Some(true),
            has_video: Some(true),
            output_mode: Some("composed".to_string()),
            reason: Some(String::new()),
            url: None,
        };
        state.archives.push(job.clone());
        Ok(job)
    }

    async fn stop_archive(&self, archive_id: &str) -> Result<ArchiveJob, PlatformError> {
        let mut state = self.state();
        Self::check_transport(&mut state)?;

        let job = state
            .archives
            .iter_mut()
            .find(|job| job.archive_id == archive_id)
            .ok_or_else(|| PlatformError::NotFound(format!("archive {}", archive_id)))?;

        if !is_recording(job.status) {
            return Err(PlatformError::Upstream {
                status: 409,
                message: "Archive is not currently recording".to_string(),
            });
        }
        job.status = ArchiveStatus::Stopped;
        job.reason = Some("user initiated".to_string());
        Ok(job.clone())
    }

    async fn get_archive(&self, archive_id: &str) -> Result<ArchiveJob, PlatformError> {
        let mut state = self.state();
        Self::check_transport(&mut state)?;

        state
            .archives
            .iter()
            .find(|job| job.archive_id == archive_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("archive {}", archive_id)))
    }

    async fn list_archives(
        &self,
        offset: u32,
        count: u32,
    ) -> Result<Vec<ArchiveJob>, PlatformError> {
        let mut state = self.state();
        Self::check_transport(&mut state)?;
        state.last_list = Some((offset, count));

        Ok(state
            .archives
            .iter()
            .rev()
            .skip(offset as usize)
            .take(count as usize)
            .cloned()
            .collect())
    }

    async fn send_signal(
        &self,
        session_id: &str,
        signal_type: &str,
        data: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check_transport(&mut state)?;

        if !state.sessions.contains_key(session_id) {
            return Err(PlatformError::NotFound(format!("session {}", session_id)));
        }
        state.signals.push(SentSignal {
            session_id: session_id.to_string(),
            signal_type: signal_type.to_string(),
            data: data.to_string(),
        });
        Ok(())
    }
}
