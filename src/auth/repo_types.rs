use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub username: String,           // unique login name
    pub email: String,              // user email
    pub password_hash: String,      // Argon2 PHC string
    pub created_at: OffsetDateTime, // creation timestamp
}

/// Fields needed to insert a user; the hash is computed beforehand.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Server-side record of an issued token, keyed by its digest.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub token_digest: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl SessionRecord {
    /// A record past its expiry is dead even if it is still stored.
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}
