//! Error types for the broker's HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use room_registry_core::{PlatformError, RegistryError};
use serde::Serialize;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The video platform failed. `status` is the provider's HTTP status when it answered.
    #[error("Upstream error: {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrokerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BrokerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BrokerError::NotFound(_) => StatusCode::NOT_FOUND,
            BrokerError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            BrokerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BrokerError::InvalidRequest(_) => "INVALID_REQUEST",
            BrokerError::NotFound(_) => "NOT_FOUND",
            BrokerError::Upstream { .. } => "UPSTREAM_ERROR",
            BrokerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<PlatformError> for BrokerError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotFound(what) => BrokerError::NotFound(what),
            PlatformError::Upstream { status, .. } => BrokerError::Upstream {
                status: Some(status),
                message: err.to_string(),
            },
            PlatformError::Transport(_) => BrokerError::Upstream {
                status: None,
                message: err.to_string(),
            },
            PlatformError::Token(_) => BrokerError::Internal(err.to_string()),
        }
    }
}

impl From<RegistryError> for BrokerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidKey(reason) => BrokerError::InvalidRequest(reason),
            RegistryError::NotFound(room) => BrokerError::NotFound(format!("room {}", room)),
            RegistryError::Conflict { .. } | RegistryError::Io(_) => {
                BrokerError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct ErrorBody {
            error: String,
            code: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            upstream_status: Option<u16>,
        }

        let upstream_status = match &self {
            BrokerError::Upstream { status, .. } => *status,
            _ => None,
        };

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
            upstream_status,
        };

        (self.status_code(), axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
