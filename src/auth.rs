//! Caller identity at the trust boundary.
//!
//! The ledger never inspects credentials itself. An [`AuthTokenValidator`]
//! turns a bearer credential into typed [`Claims`] once, and the account id in
//! those claims is taken as the caller's identity.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::engine::AccountId;

/// Lifetime of tokens issued without an explicit one.
pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 72;

/// Verified identity of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claims {
    pub account_id: AccountId,
    pub auth_id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingCredential,

    #[error("Invalid Authorization format")]
    MalformedHeader,

    #[error("Unauthorized: invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Unauthorized: invalid claims")]
    InvalidClaims,
}

/// Resolves a bearer credential to the caller's identity.
pub trait AuthTokenValidator: Send + Sync {
    fn validate(&self, credential: &str) -> Result<Claims, AuthError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let header = header.trim();
    if header.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    match header.split_once(' ') {
        Some(("Bearer", token)) if !token.trim().is_empty() && !token.trim().contains(' ') => {
            Ok(token.trim())
        }
        _ => Err(AuthError::MalformedHeader),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    auth_id: i64,
    account_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    exp: i64,
}

/// HS256 tokens signed with a shared secret.
pub struct JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(signing_key: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(signing_key),
            decoding: DecodingKey::from_secret(signing_key),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign a token for `claims` that expires after `lifetime`.
    pub fn issue(
        &self,
        claims: Claims,
        username: Option<&str>,
        lifetime: TimeDelta,
    ) -> Result<String, AuthError> {
        let token = TokenClaims {
            auth_id: claims.auth_id,
            account_id: claims.account_id,
            username: username.map(str::to_string),
            exp: (Utc::now() + lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &token, &self.encoding).map_err(AuthError::InvalidToken)
    }
}

impl AuthTokenValidator for JwtValidator {
    /// Accepts either a bare token or a full `Bearer <token>` header value.
    fn validate(&self, credential: &str) -> Result<Claims, AuthError> {
        let token = if credential.trim_start().starts_with("Bearer") {
            bearer_token(credential)?
        } else if credential.trim().is_empty() {
            return Err(AuthError::MissingCredential);
        } else {
            credential.trim()
        };

        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation).map_err(|err| {
            log::warn!("JWT validation failed: {err}");
            AuthError::InvalidToken(err)
        })?;

        let TokenClaims {
            auth_id,
            account_id,
            ..
        } = data.claims;
        if account_id <= 0 {
            return Err(AuthError::InvalidClaims);
        }
        Ok(Claims {
            account_id,
            auth_id,
        })
    }
}
