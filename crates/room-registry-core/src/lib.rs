//! Core traits and types for the room session registry.
//!
//! This crate defines the abstractions shared between registry backends and the broker service:
//! - `RegistryStore`: durable or volatile room name -> session id mapping
//! - `VideoPlatform`: the narrow seam onto the upstream video provider
//! - `ArchiveJob` / `ArchiveStatus`: recording jobs as reported by the provider

mod archive;
mod error;
mod platform;
mod store;

pub use archive::{ArchiveJob, ArchiveOptions, ArchiveStatus};
pub use error::{PlatformError, RegistryError};
pub use platform::{MediaMode, VideoPlatform};
pub use store::{validate_key, RegistryStore, SetOutcome, MAX_KEY_LEN};
