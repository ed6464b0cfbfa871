use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use super::jwt::{token_digest, TokenError};
use super::scope::OwnerScope;
use crate::error::AppError;
use crate::state::AppState;

/// Why a request was refused by the session guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no token")]
    NoToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("token revoked or unknown")]
    Revoked,
}

impl From<TokenError> for Rejection {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => Rejection::InvalidToken,
            TokenError::Expired => Rejection::Expired,
        }
    }
}

impl From<Rejection> for AppError {
    fn from(r: Rejection) -> Self {
        AppError::Unauthorized(r.to_string())
    }
}

/// Caller identity established from a live session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub token_digest: String,
}

impl AuthUser {
    pub fn scope(&self) -> OwnerScope {
        OwnerScope::new(self.user_id)
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Runs the guard: header, signature, expiry, then the session table.
/// The store is only consulted once the cheap checks have passed.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = bearer_token(headers).ok_or(Rejection::NoToken)?;

    let claims = state.jwt.verify(token).map_err(|e| {
        warn!(reason = %e, "rejected bearer token");
        Rejection::from(e)
    })?;

    let digest = token_digest(token);
    let record = state.sessions.find(&digest).await?;
    let now = OffsetDateTime::now_utc();
    match record {
        Some(r) if r.user_id == claims.sub => {
            if !r.is_live(now) {
                warn!(user_id = %claims.sub, "session record expired");
                return Err(Rejection::Expired.into());
            }
            debug!(user_id = %claims.sub, "session accepted");
            Ok(AuthUser {
                user_id: claims.sub,
                token_digest: digest,
            })
        }
        _ => {
            warn!(user_id = %claims.sub, "token revoked or unknown");
            Err(Rejection::Revoked.into())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers).await
    }
}
