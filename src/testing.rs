//! In-memory repositories backing `AppState::fake()` in unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{SessionRepo, UserRepo};
use crate::auth::repo_types::{NewUser, SessionRecord, User};
use crate::auth::scope::OwnerScope;
use crate::db::StoreError;
use crate::tasks::repo::TaskRepo;
use crate::tasks::repo_types::{Task, TaskPatch};

#[derive(Default)]
pub struct MemoryUsers {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepo for MemoryUsers {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict);
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(created.clone());
        Ok(created)
    }
}

#[derive(Default)]
pub struct MemorySessions {
    rows: Mutex<Vec<SessionRecord>>,
}

#[async_trait]
impl SessionRepo for MemorySessions {
    async fn insert(&self, record: SessionRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.token_digest == record.token_digest) {
            return Err(StoreError::Conflict);
        }
        rows.push(record);
        Ok(())
    }

    async fn find(&self, token_digest: &str) -> Result<Option<SessionRecord>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.token_digest == token_digest).cloned())
    }

    async fn delete(&self, token_digest: &str) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.token_digest != token_digest);
        Ok(rows.len() != before)
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.is_live(now));
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryTasks {
    rows: Mutex<Vec<Task>>,
}

#[async_trait]
impl TaskRepo for MemoryTasks {
    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        self.rows.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn list(&self, scope: OwnerScope) -> Result<Vec<Task>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|t| scope.permits(t.owner_id)).cloned().collect())
    }

    async fn find(&self, scope: OwnerScope, id: Uuid) -> Result<Option<Task>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|t| t.id == id && scope.permits(t.owner_id))
            .cloned())
    }

    async fn update(
        &self,
        scope: OwnerScope,
        id: Uuid,
        patch: TaskPatch,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(task) = rows
            .iter_mut()
            .find(|t| t.id == id && scope.permits(t.owner_id))
        else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        task.updated_at = now;
        Ok(Some(task.clone()))
    }

    async fn delete(&self, scope: OwnerScope, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| !(t.id == id && scope.permits(t.owner_id)));
        Ok(rows.len() != before)
    }
}
