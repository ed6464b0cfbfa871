use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::{LoginRequest, PublicUser, RegisterRequest};
use crate::auth::jwt::{token_digest, IssuedToken};
use crate::auth::repo_types::{NewUser, SessionRecord, User};
use crate::db::StoreError;
use crate::error::AppError;
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Normalized registration input, checked before the store is touched.
#[derive(Debug)]
pub(crate) struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl TryFrom<RegisterRequest> for Registration {
    type Error = AppError;

    fn try_from(req: RegisterRequest) -> Result<Self, Self::Error> {
        let username = req.username.trim().to_string();
        let len = username.chars().count();
        if !(3..=32).contains(&len) {
            return Err(AppError::validation(
                "username",
                "username must be 3-32 characters",
            ));
        }

        let email = req.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::validation("email", "invalid email"));
        }

        if req.password.chars().count() < 3 {
            return Err(AppError::validation(
                "password",
                "password must be at least 3 characters",
            ));
        }

        Ok(Self {
            username,
            email,
            password: req.password,
        })
    }
}

#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<User, AppError> {
    let reg = Registration::try_from(req)?;

    if state.users.find_by_username(&reg.username).await?.is_some() {
        warn!("username already registered");
        return Err(AppError::Conflict("username already exists".into()));
    }

    let password_hash = state.passwords.hash_blocking(reg.password).await?;

    let user = state
        .users
        .create(NewUser {
            username: reg.username,
            email: reg.email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict => AppError::Conflict("username already exists".into()),
            other => other.into(),
        })?;

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Verifies credentials and opens a tracked session.
#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn login(state: &AppState, req: LoginRequest) -> Result<IssuedToken, AppError> {
    let invalid = || AppError::Unauthorized("invalid username or password".into());

    let Some(user) = state.users.find_by_username(req.username.trim()).await? else {
        state.passwords.verify_dummy_blocking(req.password).await?;
        warn!("login unknown username");
        return Err(invalid());
    };

    let ok = state
        .passwords
        .verify_blocking(req.password, user.password_hash.clone())
        .await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let issued = state.jwt.issue(user.id)?;
    state
        .sessions
        .insert(SessionRecord {
            token_digest: token_digest(&issued.token),
            user_id: user.id,
            expires_at: issued.expires_at,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    info!(user_id = %user.id, jti = %issued.claims.jti, "user logged in");
    Ok(issued)
}

#[instrument(skip(state, token_digest))]
pub async fn logout(state: &AppState, user_id: Uuid, token_digest: &str) -> Result<(), AppError> {
    let removed = state.sessions.delete(token_digest).await?;
    info!(%user_id, removed, "user logged out");
    Ok(())
}

pub async fn public_user(state: &AppState, id: Uuid) -> Result<PublicUser, AppError> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(PublicUser {
        id: user.id,
        username: user.username,
        email: user.email,
    })
}

/// Deletes session records past their expiry.
pub async fn sweep_sessions(state: &AppState) -> Result<u64, StoreError> {
    let purged = state.sessions.purge_expired(OffsetDateTime::now_utc()).await?;
    if purged > 0 {
        info!(purged, "expired sessions removed");
    }
    Ok(purged)
}
