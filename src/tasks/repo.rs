use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::scope::OwnerScope;
use crate::db::{bounded, StoreError};
use crate::tasks::repo_types::{Task, TaskPatch};

/// Task persistence. Every lookup by id also matches the owner, so a task
/// belonging to someone else is indistinguishable from a missing one.
#[async_trait]
pub trait TaskRepo: Send + Sync {
    async fn insert(&self, task: Task) -> Result<Task, StoreError>;
    /// Tasks of the scope's owner in creation order.
    async fn list(&self, scope: OwnerScope) -> Result<Vec<Task>, StoreError>;
    async fn find(&self, scope: OwnerScope, id: Uuid) -> Result<Option<Task>, StoreError>;
    async fn update(
        &self,
        scope: OwnerScope,
        id: Uuid,
        patch: TaskPatch,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, StoreError>;
    async fn delete(&self, scope: OwnerScope, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgTaskRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgTaskRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl TaskRepo for PgTaskRepo {
    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        bounded(
            self.timeout,
            "tasks.insert",
            sqlx::query_as::<_, Task>(
                r#"
                INSERT INTO tasks (id, owner_id, title, completed, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, owner_id, title, completed, created_at, updated_at
                "#,
            )
            .bind(task.id)
            .bind(task.owner_id)
            .bind(&task.title)
            .bind(task.completed)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn list(&self, scope: OwnerScope) -> Result<Vec<Task>, StoreError> {
        bounded(
            self.timeout,
            "tasks.list",
            sqlx::query_as::<_, Task>(
                r#"
                SELECT id, owner_id, title, completed, created_at, updated_at
                FROM tasks
                WHERE owner_id = $1
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .bind(scope.owner())
            .fetch_all(&self.db),
        )
        .await
    }

    async fn find(&self, scope: OwnerScope, id: Uuid) -> Result<Option<Task>, StoreError> {
        bounded(
            self.timeout,
            "tasks.find",
            sqlx::query_as::<_, Task>(
                r#"
                SELECT id, owner_id, title, completed, created_at, updated_at
                FROM tasks
                WHERE id = $1 AND owner_id = $2
                "#,
            )
            .bind(id)
            .bind(scope.owner())
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn update(
        &self,
        scope: OwnerScope,
        id: Uuid,
        patch: TaskPatch,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, StoreError> {
        bounded(
            self.timeout,
            "tasks.update",
            sqlx::query_as::<_, Task>(
                r#"
                UPDATE tasks
                SET title = COALESCE($3, title),
                    completed = COALESCE($4, completed),
                    updated_at = $5
                WHERE id = $1 AND owner_id = $2
                RETURNING id, owner_id, title, completed, created_at, updated_at
                "#,
            )
            .bind(id)
            .bind(scope.owner())
            .bind(patch.title)
            .bind(patch.completed)
            .bind(now)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn delete(&self, scope: OwnerScope, id: Uuid) -> Result<bool, StoreError> {
        let res = bounded(
            self.timeout,
            "tasks.delete",
            sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(scope.owner())
                .execute(&self.db),
        )
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
