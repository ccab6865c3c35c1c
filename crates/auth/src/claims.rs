use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dinehub_core::{BusinessId, OwnerId};

/// Business-owner JWT claims (transport-agnostic).
///
/// `iat`/`exp` are seconds since the Unix epoch, as in registered JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerClaims {
    /// Subject: the business owner account.
    pub sub: OwnerId,

    /// Business the owner acts for.
    #[serde(rename = "businessId")]
    pub business_id: BusinessId,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

impl OwnerClaims {
    /// Claims valid from `now` for `ttl`.
    pub fn issue(sub: OwnerId, business_id: BusinessId, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            sub,
            business_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate the claim time window.
///
/// Signature verification happens in [`crate::jwt`]; this only looks at the
/// decoded claims.
pub fn validate_claims(claims: &OwnerClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
