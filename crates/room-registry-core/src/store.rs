use async_trait::async_trait;

use crate::error::RegistryError;

/// Result of an atomic insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    /// The value now stored under the key (ours if `created`, the winner's otherwise).
    pub value: String,
    /// Whether this call wrote the value.
    pub created: bool,
}

/// Key-value store mapping room names to provider session ids.
///
/// Mappings are append-only: once a key holds a value it is never overwritten.
/// Implementations must allow concurrent readers.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Human-readable backend name, for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Check whether a room has a mapping.
    async fn exists(&self, key: &str) -> Result<bool, RegistryError>;

    /// Get the session id for a room, or `RegistryError::NotFound`.
    async fn get(&self, key: &str) -> Result<String, RegistryError>;

    /// Store a mapping. Fails with `RegistryError::Conflict` if the key is already present.
    async fn set(&self, key: &str, value: &str) -> Result<(), RegistryError>;

    /// Store a mapping unless one exists, atomically.
    ///
    /// Returns the stored value and whether this call created it.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<SetOutcome, RegistryError>;

    /// Remove every mapping.
    async fn clear(&self) -> Result<(), RegistryError>;
}

/// Longest accepted room name, in bytes.
///
/// The file backend stages writes in `.{key}.tmp`, which must fit the usual
/// 255-byte file name limit.
pub const MAX_KEY_LEN: usize = 250;

/// Validate a room name before it is used as a store key.
///
/// Rejects empty or over-long names, path separators, NUL, and names starting
/// with `.` (which covers `.` and `..`).
pub fn validate_key(key: &str) -> Result<(), RegistryError> {
    if key.is_empty() {
        return Err(RegistryError::InvalidKey("room name is empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(RegistryError::InvalidKey(format!(
            "room name is {} bytes, the limit is {}",
            key.len(),
            MAX_KEY_LEN
        )));
    }
    if key.starts_with('.') {
        return Err(RegistryError::InvalidKey(format!(
            "room name may not start with '.': {}",
            key
        )));
    }
    if key.contains(['/', '\\', '\0']) {
        return Err(RegistryError::InvalidKey(format!(
            "room name contains a reserved character: {}",
            key.escape_default()
        )));
    }
    Ok(())
}
