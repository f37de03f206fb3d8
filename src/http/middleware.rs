//! Authentication, role extraction and mutation rate limiting

use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::combat::Role;
use crate::http::routes::AppError;
use crate::util::time::unix_secs;

type HmacSha256 = Hmac<Sha256>;

/// Provider-managed metadata carried in the token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Campaign role, "mj" for the game master
    #[serde(default)]
    pub role: Option<String>,
}

/// JWT claims from Supabase auth token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Email (if available)
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: Option<AppMetadata>,
}

impl JwtClaims {
    pub fn role(&self) -> Role {
        Role::from_claim(
            self.app_metadata
                .as_ref()
                .and_then(|meta| meta.role.as_deref()),
        )
    }
}

/// Verify a JWT token and extract claims
pub fn verify_jwt(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    // Verify signature (HMAC-SHA256)
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());

    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    mac.verify_slice(&provided_signature)
        .map_err(|_| AuthError::InvalidToken)?;

    // Decode payload
    let payload_json = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AuthError::InvalidToken)?;

    let claims: JwtClaims =
        serde_json::from_slice(&payload_json).map_err(|_| AuthError::InvalidToken)?;

    if claims.exp < unix_secs() {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization header format")]
    InvalidFormat,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::MissingHeader => StatusCode::UNAUTHORIZED,
            AuthError::InvalidFormat => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
        };

        (status, self.to_string()).into_response()
    }
}

/// Authenticated caller, inserted into request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
}

/// Middleware to require authentication
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !request.headers().contains_key(header::AUTHORIZATION) {
        return Err(AuthError::MissingHeader);
    }

    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AuthError::InvalidFormat)?;

    let claims = verify_jwt(bearer.token(), &state.config.supabase_jwt_secret).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        e
    })?;

    let auth_user = AuthenticatedUser {
        user_id: claims.sub,
        role: claims.role(),
    };

    // Insert into request extensions for handlers to access
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Per-user limiter in front of every mutating request; reads pass through.
/// Runs after `require_auth`, which supplies the key.
pub async fn limit_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let is_read = matches!(*request.method(), Method::GET | Method::HEAD);
    if !is_read {
        let user_id = request
            .extensions()
            .get::<AuthenticatedUser>()
            .map(|user| user.user_id)
            .unwrap_or(Uuid::nil());

        if state.mutation_limiter.check_key(&user_id).is_err() {
            warn!(user_id = %user_id, path = %request.uri().path(), "Mutation rate limit hit");
            return Err(AppError::RateLimited);
        }
    }

    Ok(next.run(request).await)
}

/// Token minting for tests
#[cfg(test)]
pub fn sign_jwt(claims: &serde_json::Value, secret: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", header, payload).as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{}.{}.{}", header, payload, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn claims(role: Option<&str>, exp: u64) -> serde_json::Value {
        json!({
            "sub": Uuid::new_v4(),
            "exp": exp,
            "role": "authenticated",
            "app_metadata": { "role": role },
        })
    }

    #[test]
    fn accepts_valid_token_and_reads_role() {
        let token = sign_jwt(&claims(Some("mj"), unix_secs() + 60), SECRET);
        let claims = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.role(), Role::GameMaster);

        let token = sign_jwt(&claims_without_metadata(), SECRET);
        assert_eq!(verify_jwt(&token, SECRET).unwrap().role(), Role::Player);
    }

    fn claims_without_metadata() -> serde_json::Value {
        json!({ "sub": Uuid::new_v4(), "exp": unix_secs() + 60 })
    }

    #[test]
    fn rejects_tampered_expired_and_malformed_tokens() {
        let token = sign_jwt(&claims(None, unix_secs() + 60), SECRET);
        assert!(matches!(
            verify_jwt(&token, "other-secret"),
            Err(AuthError::InvalidToken)
        ));

        let expired = sign_jwt(&claims(None, 1), SECRET);
        assert!(matches!(verify_jwt(&expired, SECRET), Err(AuthError::TokenExpired)));

        assert!(matches!(verify_jwt("a.b", SECRET), Err(AuthError::InvalidToken)));
        assert!(matches!(verify_jwt("a.b.c.d", SECRET), Err(AuthError::InvalidToken)));
    }
}
