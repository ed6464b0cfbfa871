use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, SessionRecord, User};
use crate::db::{bounded, StoreError};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::Conflict`] when the username is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn insert(&self, record: SessionRecord) -> Result<(), StoreError>;
    async fn find(&self, token_digest: &str) -> Result<Option<SessionRecord>, StoreError>;
    /// Returns whether a record was removed.
    async fn delete(&self, token_digest: &str) -> Result<bool, StoreError>;
    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgUserRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        bounded(
            self.timeout,
            "users.find_by_username",
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, created_at
                FROM users
                WHERE username = $1
                "#,
            )
            .bind(username)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        bounded(
            self.timeout,
            "users.find_by_id",
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, created_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        bounded(
            self.timeout,
            "users.create",
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, username, email, password_hash)
                VALUES ($1, $2, $3, $4)
                RETURNING id, username, email, password_hash, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.db),
        )
        .await
    }
}

#[derive(Clone)]
pub struct PgSessionRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgSessionRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl SessionRepo for PgSessionRepo {
    async fn insert(&self, record: SessionRecord) -> Result<(), StoreError> {
        bounded(
            self.timeout,
            "sessions.insert",
            sqlx::query(
                r#"
                INSERT INTO sessions (token_digest, user_id, expires_at, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&record.token_digest)
            .bind(record.user_id)
            .bind(record.expires_at)
            .bind(record.created_at)
            .execute(&self.db),
        )
        .await?;
        Ok(())
    }

    async fn find(&self, token_digest: &str) -> Result<Option<SessionRecord>, StoreError> {
        bounded(
            self.timeout,
            "sessions.find",
            sqlx::query_as::<_, SessionRecord>(
                r#"
                SELECT token_digest, user_id, expires_at, created_at
                FROM sessions
                WHERE token_digest = $1
                "#,
            )
            .bind(token_digest)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn delete(&self, token_digest: &str) -> Result<bool, StoreError> {
        let res = bounded(
            self.timeout,
            "sessions.delete",
            sqlx::query("DELETE FROM sessions WHERE token_digest = $1")
                .bind(token_digest)
                .execute(&self.db),
        )
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let res = bounded(
            self.timeout,
            "sessions.purge_expired",
            sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
                .bind(now)
                .execute(&self.db),
        )
        .await?;
        Ok(res.rows_affected())
    }
}
