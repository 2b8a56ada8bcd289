//! Signed, time-limited bearer tokens.
//!
//! A token is `base64url(claims) "." base64url(HMAC-SHA256(claims))` where
//! claims is the JSON object `{"sub": <uuid>, "exp": <unix seconds>}`. No
//! server-side state is kept: a token is valid iff its signature verifies
//! against the process secret and the current time is before `exp`.

use anyhow::Result;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_LIFETIME_DAYS: i64 = 14;

/// Why a token was rejected. Never rendered to clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    exp: i64,
}

/// A freshly signed token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// Issues and verifies bearer tokens with a process-wide secret.
///
/// Built once at startup and shared read-only behind an `Arc`.
#[derive(Clone)]
pub struct TokenService {
    mac: HmacSha256,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a service keyed by `secret`.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty.
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self> {
        if secret.is_empty() {
            anyhow::bail!("Token signing secret must not be empty");
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow::anyhow!("Invalid signing secret: {e}"))?;
        Ok(Self { mac, lifetime })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Signs a token for `subject` expiring one lifetime from now.
    pub fn issue(&self, subject: Uuid) -> IssuedToken {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: Uuid, now: DateTime<Utc>) -> IssuedToken {
        let expires = now + self.lifetime;
        let claims = Claims {
            sub: subject,
            exp: expires.timestamp(),
        };

        // Serializing a struct of a uuid and an integer cannot fail.
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default());
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));

        IssuedToken {
            token: format!("{payload}.{signature}"),
            expires: DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires),
        }
    }

    /// Returns the subject of a valid token.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Malformed`] for bad structure, encoding or signature
    /// - [`TokenError::Expired`] once the expiry instant has passed
    pub fn resolve(&self, token: &str) -> Result<Uuid, TokenError> {
        self.resolve_at(token, Utc::now())
    }

    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Malformed)?;

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or(TokenError::Malformed)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims.sub)
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}
