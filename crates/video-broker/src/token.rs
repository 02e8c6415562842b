use std::sync::Arc;

use room_registry_core::VideoPlatform;
use serde::Serialize;

use crate::error::Result;

/// Credentials a client needs to join a session.
///
/// Minted fresh for every request, never cached or persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub api_key: String,
    pub session_id: String,
    pub token: String,
}

/// Stateless pass-through to the platform's token minting.
pub struct TokenIssuer {
    platform: Arc<dyn VideoPlatform>,
}

impl TokenIssuer {
    pub fn new(platform: Arc<dyn VideoPlatform>) -> Self {
        Self { platform }
    }

    pub async fn issue(&self, session_id: &str) -> Result<AccessToken> {
        let token = self.platform.generate_token(session_id).await?;
        Ok(AccessToken {
            api_key: self.platform.api_key().to_string(),
            session_id: session_id.to_string(),
            token,
        })
    }
}
