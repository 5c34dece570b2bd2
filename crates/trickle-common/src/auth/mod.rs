//! Bearer token introspection

mod token;

pub use token::{decode_claims, TokenClaims, TokenError};
