use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use room_registry_core::MediaMode;
use room_registry_local::StoreKind;

/// Default name given to recordings started through the broker.
pub const DEFAULT_ARCHIVE_NAME: &str = "Getting Started Sample Archive";

/// Longest client token lifetime the provider accepts (30 days).
pub const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Configuration for the video-broker server.
#[derive(Parser, Debug, Clone)]
#[command(name = "video-broker")]
#[command(about = "Maps room names to video sessions and proxies archive operations")]
pub struct Config {
    /// TCP host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// TCP port to bind to
    #[arg(long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Video platform API key (publishable, returned to clients)
    #[arg(long, env = "TOKBOX_API_KEY")]
    pub api_key: String,

    /// Video platform API secret
    #[arg(long, env = "TOKBOX_SECRET", hide_env_values = true)]
    pub api_secret: String,

    /// Base URL of the video platform REST API
    #[arg(long, default_value = "https://api.opentok.com", env = "OPENTOK_API_URL")]
    pub api_url: String,

    /// Registry backend: "file" or "memory"
    #[arg(long, default_value = "file", env = "STORE_BACKEND")]
    pub store_backend: StoreKind,

    /// Directory holding one file per room (file backend)
    #[arg(long, default_value = "storage", env = "STORAGE_DIR")]
    pub storage_dir: PathBuf,

    /// Media mode for newly created sessions: "routed" or "relayed"
    #[arg(long, default_value = "routed", env = "MEDIA_MODE")]
    pub media_mode: MediaMode,

    /// Name given to archives started through the broker
    #[arg(long, default_value = DEFAULT_ARCHIVE_NAME, env = "ARCHIVE_NAME")]
    pub archive_name: String,

    /// Optional cap applied to the `count` of archive listings
    #[arg(long, env = "ARCHIVE_MAX_COUNT")]
    pub archive_max_count: Option<u32>,

    /// Timeout for each call to the video platform (seconds)
    #[arg(long, default_value = "10", env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: u64,

    /// Lifetime of minted client tokens (seconds)
    #[arg(long, default_value = "86400", env = "TOKEN_TTL_SECS")]
    pub token_ttl_secs: u64,

    /// When set, provider event callbacks are appended to events.txt in this directory
    #[arg(long, env = "EVENTS_LOG_DIR")]
    pub events_log_dir: Option<PathBuf>,
}

impl Config {
    /// Reject configurations the process must not start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() || self.api_secret.trim().is_empty() {
            anyhow::bail!("You must define TOKBOX_API_KEY and TOKBOX_SECRET");
        }
        if self.upstream_timeout_secs == 0 {
            anyhow::bail!("UPSTREAM_TIMEOUT_SECS must be greater than zero");
        }
        if self.token_ttl_secs == 0 || self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            anyhow::bail!(
                "TOKEN_TTL_SECS must be between 1 and {} (30 days)",
                MAX_TOKEN_TTL_SECS
            );
        }
        Ok(())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// API base URL without a trailing slash.
    pub fn api_base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}
