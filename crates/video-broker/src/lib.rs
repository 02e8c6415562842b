//! Video room broker.
//!
//! Maps human-chosen room names to provider session ids (created on first use),
//! mints client tokens and proxies the archive lifecycle to the video platform.

pub mod archive;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod opentok;
pub mod resolver;
pub mod routes;
pub mod state;
pub mod token;

pub use archive::{ArchiveController, ListParams, ViewResult};
pub use config::Config;
pub use error::{BrokerError, Result};
pub use memory::MemoryPlatform;
pub use opentok::OpenTokClient;
pub use resolver::{ResolvedRoom, SessionResolver};
pub use routes::create_router;
pub use state::{AppState, BrokerSettings};
pub use token::{AccessToken, TokenIssuer};
