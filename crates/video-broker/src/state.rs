use std::path::PathBuf;
use std::sync::Arc;

use room_registry_core::{MediaMode, RegistryStore, VideoPlatform};

use crate::archive::ArchiveController;
use crate::config::{Config, DEFAULT_ARCHIVE_NAME};
use crate::resolver::SessionResolver;
use crate::token::TokenIssuer;

/// Behaviour knobs for the broker, independent of how it is launched.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub media_mode: MediaMode,
    pub archive_name: String,
    pub archive_max_count: Option<u32>,
    pub events_log_dir: Option<PathBuf>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            media_mode: MediaMode::Routed,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            archive_max_count: None,
            events_log_dir: None,
        }
    }
}

impl From<&Config> for BrokerSettings {
    fn from(config: &Config) -> Self {
        Self {
            media_mode: config.media_mode,
            archive_name: config.archive_name.clone(),
            archive_max_count: config.archive_max_count,
            events_log_dir: config.events_log_dir.clone(),
        }
    }
}

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<SessionResolver>,
    pub tokens: Arc<TokenIssuer>,
    pub archives: Arc<ArchiveController>,
    pub platform: Arc<dyn VideoPlatform>,
    pub events_log_dir: Option<PathBuf>,
}

impl AppState {
    /// Wire the core components around one store and one platform binding.
    pub fn new(
        store: Arc<dyn RegistryStore>,
        platform: Arc<dyn VideoPlatform>,
        settings: BrokerSettings,
    ) -> Self {
        Self {
            resolver: Arc::new(SessionResolver::new(
                store,
                platform.clone(),
                settings.media_mode,
            )),
            tokens: Arc::new(TokenIssuer::new(platform.clone())),
            archives: Arc::new(ArchiveController::new(
                platform.clone(),
                settings.archive_name,
                settings.archive_max_count,
            )),
            platform,
            events_log_dir: settings.events_log_dir,
        }
    }
}
