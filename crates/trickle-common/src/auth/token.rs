//! Bearer token claim introspection
//!
//! The push gateway issues tokens elsewhere; this client never verifies
//! signatures, it only reads the registered claims to reason about expiry.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Registered claims carried by a gateway bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    /// Check if the token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Expiration time as a UTC timestamp, if representable
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Issue time as a UTC timestamp, if representable
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }
}

/// Decode the claims of a bearer token without verifying its signature
///
/// Expired tokens still decode; callers decide what staleness means via
/// [`TokenClaims::is_expired`].
///
/// # Errors
/// Returns an error if the token is not a structurally valid JWT or its
/// claims do not match the expected shape.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.set_required_spec_claims::<&str>(&[]);

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|_| TokenError::Malformed)?;

    Ok(data.claims)
}

/// Token introspection errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token is not a structurally valid JWT")]
    Malformed,
}
