//! JWT issuance and verification (HS256, shared secret).
//!
//! Access tokens carry an expiry; refresh tokens are issued without one
//! and are bounded by the blacklist instead. A `kind` claim keeps the two
//! from being interchangeable.

use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    /// Bad signature, wrong kind, expired — deliberately undifferentiated.
    #[error("Token rejected")]
    Invalid,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable account id.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub kind: TokenKind,
}

#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], access_ttl: Duration) -> Self {
        TokenSigner {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
        }
    }

    /// Issue a short-lived access token.
    pub fn issue_access(&self, sub: &str, username: &str) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp();
        self.sign(Claims {
            sub: sub.to_string(),
            username: username.to_string(),
            iat: now,
            exp: Some(now + self.access_ttl.as_secs() as i64),
            kind: TokenKind::Access,
        })
    }

    /// Issue a refresh token. No expiry is set at issuance; revocation is
    /// the blacklist's job.
    pub fn issue_refresh(&self, sub: &str, username: &str) -> Result<String, TokenError> {
        self.sign(Claims {
            sub: sub.to_string(),
            username: username.to_string(),
            iat: chrono::Utc::now().timestamp(),
            exp: None,
            kind: TokenKind::Refresh,
        })
    }

    /// Verify signature, expiry and kind of an access token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| TokenError::Invalid)?;
        if data.claims.kind != TokenKind::Access {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims)
    }

    /// Verify signature and kind of a refresh token. Expiry is not
    /// required; the caller checks the blacklist separately.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = Default::default();
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| TokenError::Invalid)?;
        if data.claims.kind != TokenKind::Refresh {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims)
    }

    fn sign(&self, claims: Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}
