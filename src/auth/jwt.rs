//! Token Codec
//!
//! Issues and decodes access and refresh tokens. Two wire schemes are
//! supported:
//!
//! - [`TokenScheme::Signed`]: HS256 JWTs. A payload edited by the holder no
//!   longer decodes.
//! - [`TokenScheme::Legacy`]: standard base64 of the JSON payload, unsigned.
//!   Any well-formed string decodes to trusted claims. Kept for reading
//!   sessions persisted by the browser client.
//!
//! Expiry is checked here against the injected [`Clock`], with no leeway:
//! a token is valid iff `exp > now`.

use std::str::FromStr;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::auth::models::{AccessClaims, IdentityClaims, RefreshClaims};
use crate::clock::Clock;
use crate::error::AuthError;

/// Default access token lifetime, in seconds.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
/// Default refresh token lifetime, in seconds.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScheme {
    Signed,
    Legacy,
}

impl FromStr for TokenScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signed" | "jwt" => Ok(TokenScheme::Signed),
            "legacy" | "base64" => Ok(TokenScheme::Legacy),
            other => Err(format!("unknown token scheme: {other}")),
        }
    }
}

/// Only the expiry, which both token kinds carry.
#[derive(Deserialize)]
struct Expiry {
    exp: i64,
}

/// Token codec shared by every session manager in the process.
#[derive(Clone)]
pub struct TokenCodec {
    scheme: TokenScheme,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Create a codec with the default 15 minute / 7 day lifetimes.
    pub fn new(scheme: TokenScheme, secret: &str, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            scheme,
            encoding_key,
            decoding_key,
            validation,
            access_ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            refresh_ttl: Duration::seconds(REFRESH_TOKEN_TTL_SECS),
            clock,
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn scheme(&self) -> TokenScheme {
        self.scheme
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issue an access token for `identity`, expiring `access_ttl` from now.
    pub fn issue_access_token(&self, identity: &IdentityClaims) -> Result<String, AuthError> {
        let claims = AccessClaims {
            id: identity.id.clone(),
            email: identity.email.clone(),
            role: identity.role,
            exp: (self.clock.now() + self.access_ttl).timestamp(),
        };
        self.encode_claims(&claims)
    }

    /// Issue a refresh token for `user_id`, expiring `refresh_ttl` from now.
    pub fn issue_refresh_token(&self, user_id: &str) -> Result<String, AuthError> {
        let claims = RefreshClaims {
            user_id: user_id.to_string(),
            exp: (self.clock.now() + self.refresh_ttl).timestamp(),
        };
        self.encode_claims(&claims)
    }

    /// Decode access token claims. Does not check expiry.
    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.decode_claims(token)
    }

    /// Decode refresh token claims. Does not check expiry.
    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        self.decode_claims(token)
    }

    /// True iff the token decodes and has not expired. Never fails; a
    /// malformed token and an expired one are indistinguishable here.
    pub fn is_valid(&self, token: &str) -> bool {
        match self.decode_claims::<Expiry>(token) {
            Ok(Expiry { exp }) => exp > self.clock.timestamp(),
            Err(e) => {
                tracing::debug!("[TokenCodec] token rejected: {}", e);
                false
            }
        }
    }

    fn encode_claims<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        match self.scheme {
            TokenScheme::Signed => encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
                .map_err(|e| AuthError::Encode(e.to_string())),
            TokenScheme::Legacy => {
                let json = serde_json::to_vec(claims).map_err(|e| AuthError::Encode(e.to_string()))?;
                Ok(STANDARD.encode(json))
            }
        }
    }

    fn decode_claims<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        match self.scheme {
            TokenScheme::Signed => {
                let data = decode::<T>(token, &self.decoding_key, &self.validation)?;
                Ok(data.claims)
            }
            TokenScheme::Legacy => {
                let bytes = STANDARD.decode(token.trim())?;
                Ok(serde_json::from_slice(&bytes)?)
            }
        }
    }
}
