//! Project-level JWT sent as `X-OPENTOK-AUTH` on every REST call.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use room_registry_core::PlatformError;
use serde::{Deserialize, Serialize};

pub const AUTH_HEADER: &str = "X-OPENTOK-AUTH";

/// Lifetime of a project JWT, in seconds.
const JWT_TTL_SECS: i64 = 300;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectClaims {
    pub iss: String,
    pub ist: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Build a short-lived JWT authenticating as the project.
pub fn project_jwt(api_key: &str, api_secret: &str, now: i64) -> Result<String, PlatformError> {
    let claims = ProjectClaims {
        iss: api_key.to_string(),
        ist: "project".to_string(),
        iat: now,
        exp: now + JWT_TTL_SECS,
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(api_secret.as_bytes()),
    )
    .map_err(|e| PlatformError::Token(format!("Failed to sign project JWT: {}", e)))
}
