//! Bearer-token authentication for API routes.
//!
//! The identity provider issues HS256 JWTs; this application only verifies
//! them (shared-secret HMAC, expiry check) and never mints tokens. The
//! verified subject id and email become the request's [`Principal`].

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use tackroom_core::{Email, PrincipalId};

use crate::services::Principal;

/// Token verification failures. All map to 401 without detail leakage.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature verification failed")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    exp: i64,
}

/// Verifies bearer tokens against the identity provider's shared secret.
#[derive(Clone)]
pub struct AuthVerifier {
    secret: SecretString,
}

impl AuthVerifier {
    /// Create a verifier for the given shared secret.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verify a compact JWT and extract the principal it names.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] for structural problems, a non-HS256 algorithm,
    /// a bad signature, expiry, or claims that do not parse.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let mut parts = token.splitn(3, '.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed);
        };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| AuthError::Malformed)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| AuthError::Malformed)?;
        if header.alg != "HS256" {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        // Signature covers the raw base64 of header and claims.
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::Malformed)?;
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::BadSignature)?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| AuthError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(|e| AuthError::InvalidClaims(e.to_string()))?;

        let now = chrono::Utc::now().timestamp();
        if claims.exp <= now {
            return Err(AuthError::Expired);
        }

        let id = PrincipalId::parse(&claims.sub)
            .map_err(|_| AuthError::InvalidClaims("subject is not a UUID".to_string()))?;
        let email = Email::parse(&claims.email)
            .map_err(|e| AuthError::InvalidClaims(e.to_string()))?;

        Ok(Principal { id, email })
    }
}

/// Extractor that requires a valid bearer token.
///
/// Rejects with 401 when the `Authorization` header is missing, is not a
/// bearer token, or fails verification.
pub struct RequireAuth(pub Principal);

/// Rejection for [`RequireAuth`]. Deliberately detail-free.
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AuthVerifier: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = AuthVerifier::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthRejection)?;
        match verifier.verify(token) {
            Ok(principal) => Ok(Self(principal)),
            Err(e) => {
                tracing::debug!(error = %e, "bearer token rejected");
                Err(AuthRejection)
            }
        }
    }
}

/// Extractor that resolves the principal when a valid token is present but
/// never rejects the request.
pub struct OptionalAuth(pub Option<Principal>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
    AuthVerifier: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = AuthVerifier::from_ref(state);
        let principal = bearer_token(parts).and_then(|token| verifier.verify(token).ok());
        Ok(Self(principal))
    }
}
