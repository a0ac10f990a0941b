//! JWT authentication module.
//!
//! Bearer tokens are RS256-signed by an external identity service; this
//! server only verifies them against the public key baked into the binary.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! require_auth ──► JwtVerifier::verify ──► UserInfo in request extensions
//!        │                  │
//!        └── 401 ◄──────────┘ missing / malformed / expired / bad signature / not RS256
//! ```

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use goods_core::UserInfo;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Public half of the identity service's signing key.
const EMBEDDED_PUBLIC_KEY: &[u8] = include_bytes!("../keys/public_key.pem");

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,

    pub email: String,

    pub role: String,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl From<Claims> for UserInfo {
    fn from(claims: Claims) -> Self {
        UserInfo {
            id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Authentication failures. All of them render as 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("authorization header is not a bearer token")]
    MalformedHeader,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid verification key: {0}")]
    InvalidKey(String),
}

/// RS256 token verifier.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Verifier over the key embedded at build time.
    pub fn embedded() -> Result<Self, AuthError> {
        Self::from_rsa_pem(EMBEDDED_PUBLIC_KEY)
    }

    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, AuthError> {
        let key =
            DecodingKey::from_rsa_pem(pem).map_err(|e| AuthError::InvalidKey(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = vec![Algorithm::RS256];
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(JwtVerifier { key, validation })
    }

    /// Validate and decode a token.
    pub fn verify(&self, token: &str) -> Result<UserInfo, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;
        Ok(data.claims.into())
    }
}

/// Extract bearer token from authorization header.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MalformedHeader)
}

/// Middleware that rejects requests without a valid bearer token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let user = bearer_token(header)
        .and_then(|token| state.verifier.verify(token))
        .inspect_err(|e| debug!(error = %e, "rejected request"))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
