//! Signed bearer tokens carrying a user id.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, MAX_TOKEN_TTL_HOURS};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Token expiry is out of range")]
    ExpiryOutOfRange,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: i64,
    iat: i64,
    exp: i64,
}

/// Issues and verifies HS256 tokens with a fixed lifetime.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Lifetimes beyond [`MAX_TOKEN_TTL_HOURS`] are clamped to it.
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        let hours = ttl_hours.min(MAX_TOKEN_TTL_HOURS) as i64;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(hours),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        match auth.jwt_secret.as_deref() {
            Some(secret) => Self::new(secret, auth.token_ttl_hours),
            None => {
                tracing::warn!(
                    "No JWT secret configured; using a random secret, tokens will not survive a restart"
                );
                Self::new(&generate_secret(), auth.token_ttl_hours)
            }
        }
    }

    pub fn generate(&self, user_id: i64) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.ttl)
                .ok_or(TokenError::ExpiryOutOfRange)?
                .timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Returns the user id of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims.user_id)
    }
}

/// 32 random bytes as hex.
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
