/// Errors raised by registry store backends.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid room key: {0}")]
    InvalidKey(String),

    #[error("Room not found: {0}")]
    NotFound(String),

    /// The key already maps to a session. Callers recover by adopting `existing`.
    #[error("Room {key} is already mapped")]
    Conflict { key: String, existing: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

/// Errors raised by a video platform binding.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The referenced archive or session does not exist upstream.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider answered with a non-success status.
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The provider could not be reached or its answer could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Token generation failed: {0}")]
    Token(String),
}
