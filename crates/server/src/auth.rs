//! Bearer tokens.
//!
//! Access and refresh tokens are HS256 JWTs whose subject is the user id. The
//! `type` claim keeps a refresh token from being accepted where an access
//! token is expected.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// A signed token and the instant it stops being valid.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signing keys and token lifetimes.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl TokenKeys {
    pub fn new(secret: &str, access_ttl: TimeDelta, refresh_ttl: TimeDelta) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        token_type: TokenType,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let expires_at = now
            + match token_type {
                TokenType::Access => self.access_ttl,
                TokenType::Refresh => self.refresh_ttl,
            };
        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
            token_type,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Return the user id carried by a valid, unexpired token of type
    /// `expected`.
    pub fn verify(&self, token: &str, expected: TokenType) -> Option<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|err| tracing::debug!("rejected token: {err}"))
            .ok()?;
        if data.claims.token_type != expected {
            return None;
        }
        Uuid::parse_str(&data.claims.sub).ok()
    }
}
