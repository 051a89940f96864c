use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    models::{Role, User},
};

/// IdentityClaims
///
/// The identity carried inside every token. Once the signature and expiry
/// checks pass these values are trusted as-is; the user table is not consulted
/// again for the lifetime of the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct IdentityClaims {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for IdentityClaims {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// TokenClaims
///
/// JWT payload: the identity fields at the top level plus the standard
/// `exp` / `iat` timestamps (Unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub identity: IdentityClaims,
    pub exp: i64,
    pub iat: i64,
}

/// TokenError
///
/// Why a presented credential was refused. All three surface as 401, each
/// with its own code so clients can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No `Authorization` header, a scheme other than `Bearer`, or an empty token.
    #[error("Missing or malformed bearer token")]
    MissingToken,
    /// Signature verified, but the current time is at or past `exp`.
    #[error("Token has expired")]
    Expired,
    /// Bad signature, wrong algorithm, or an unreadable payload.
    #[error("Invalid token")]
    Malformed,
}

impl TokenError {
    pub fn code(self) -> &'static str {
        match self {
            TokenError::MissingToken => "MISSING_TOKEN",
            TokenError::Expired => "TOKEN_EXPIRED",
            TokenError::Malformed => "MALFORMED_TOKEN",
        }
    }
}

// --- Token Issuer ---

/// TokenIssuer
///
/// Mints HS256 tokens with the process-wide secret. Construct once from
/// `AppConfig` at startup; rotating the secret invalidates every outstanding token.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token valid from now for the configured ttl.
    /// Only call this after the credentials have been verified.
    pub fn issue(&self, claims: &IdentityClaims) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(claims, Utc::now().timestamp())
    }

    /// Same as [`TokenIssuer::issue`] with an explicit clock reading (Unix seconds).
    pub fn issue_at(
        &self,
        claims: &IdentityClaims,
        now: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let payload = TokenClaims {
            identity: claims.clone(),
            exp: now.saturating_add(ttl),
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &payload, &self.key)
    }
}

// --- Token Validator ---

/// TokenValidator
///
/// Verifies tokens minted by a [`TokenIssuer`] holding the same secret.
/// Expiry is checked here rather than by `jsonwebtoken`: the library applies
/// leeway and treats `exp == now` as still valid, while a token is only valid
/// strictly before `exp`.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Signature first, expiry second: a forged token is `Malformed` even if
    /// its claimed `exp` is in the past.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<IdentityClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(kind = ?e.kind(), "token failed verification");
            TokenError::Malformed
        })?;

        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims.identity)
    }
}

/// bearer_token
///
/// Pulls the token out of an `Authorization` header value. The scheme name is
/// matched case-insensitively.
pub fn bearer_token(header_value: Option<&str>) -> Result<&str, TokenError> {
    const SCHEME: &str = "bearer ";

    let value = header_value.ok_or(TokenError::MissingToken)?;
    let (scheme, token) = value
        .split_at_checked(SCHEME.len())
        .ok_or(TokenError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return Err(TokenError::MissingToken);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::MissingToken);
    }
    Ok(token)
}

// --- Authorization Gate & Ownership Check ---

/// True iff the identity's role is at or above `required`.
pub fn authorize(claims: &IdentityClaims, required: Role) -> bool {
    claims.role.rank() >= required.rank()
}

/// True iff the identity is the recorded owner. Role plays no part.
pub fn owns_resource(claims: &IdentityClaims, resource_author_id: i64) -> bool {
    claims.id == resource_author_id
}

pub fn require_role(claims: &IdentityClaims, required: Role) -> Result<(), ApiError> {
    if authorize(claims, required) {
        Ok(())
    } else {
        tracing::debug!(user_id = claims.id, role = %claims.role, required = %required, "role too low");
        Err(ApiError::InsufficientRole(required))
    }
}

pub fn require_owner(claims: &IdentityClaims, resource_author_id: i64) -> Result<(), ApiError> {
    if owns_resource(claims, resource_author_id) {
        Ok(())
    } else {
        tracing::debug!(user_id = claims.id, owner_id = resource_author_id, "not the owner");
        Err(ApiError::NotOwner)
    }
}

// --- Extractor ---

/// AuthUser
///
/// The validated identity of the caller. Using it as a handler argument makes
/// the route require a valid bearer token; the request is rejected with 401
/// before the handler runs otherwise.
///
/// The auth middleware stores the resolved value in the request extensions, so
/// handlers behind it reuse that instead of decoding the token twice.
#[derive(Debug, Clone)]
pub struct AuthUser(pub IdentityClaims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenValidator: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let claims = bearer_token(header_value)
            .and_then(|token| TokenValidator::from_ref(state).validate(token))
            .inspect_err(|e| tracing::debug!(code = e.code(), "rejected request credentials"))?;

        Ok(AuthUser(claims))
    }
}
