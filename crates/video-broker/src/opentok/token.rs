//! Client token minting in the OpenTok `T1` format.
//!
//! ```text
//! data  = session_id=..&create_time=..&expire_time=..&role=..&nonce=..
//! sig   = hex(HMAC-SHA1(api_secret, data))
//! token = "T1==" + base64("partner_id=<api key>&sig=<sig>:<data>")
//! ```

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use room_registry_core::PlatformError;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const TOKEN_SENTINEL: &str = "T1==";

/// What a client holding the token may do in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Subscriber,
    #[default]
    Publisher,
    Moderator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Subscriber => f.write_str("subscriber"),
            Role::Publisher => f.write_str("publisher"),
            Role::Moderator => f.write_str("moderator"),
        }
    }
}

/// Inputs for one token. Times are unix seconds.
#[derive(Debug, Clone)]
pub struct TokenClaims<'a> {
    pub session_id: &'a str,
    pub role: Role,
    pub create_time: i64,
    pub expire_time: i64,
    pub nonce: u64,
}

impl TokenClaims<'_> {
    fn data_string(&self) -> String {
        format!(
            "session_id={}&create_time={}&expire_time={}&role={}&nonce={}",
            self.session_id, self.create_time, self.expire_time, self.role, self.nonce
        )
    }
}

/// Sign `claims` with the account secret.
pub fn mint_token(
    api_key: &str,
    api_secret: &str,
    claims: &TokenClaims<'_>,
) -> Result<String, PlatformError> {
    if claims.session_id.is_empty() {
        return Err(PlatformError::Token("session id is empty".to_string()));
    }
    if claims.expire_time <= claims.create_time {
        return Err(PlatformError::Token(
            "token expiry must be after its creation time".to_string(),
        ));
    }

    let data = claims.data_string();
    let mut mac = HmacSha1::new_from_slice(api_secret.as_bytes())
        .map_err(|e| PlatformError::Token(e.to_string()))?;
    mac.update(data.as_bytes());
    let sig = hex::encode(mac.finalize().into_bytes());

    let payload = format!("partner_id={}&sig={}:{}", api_key, sig, data);
    Ok(format!("{}{}", TOKEN_SENTINEL, STANDARD.encode(payload)))
}
