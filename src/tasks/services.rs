use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::auth::scope::OwnerScope;
use crate::error::AppError;
use crate::state::AppState;
use crate::tasks::dto::{CreateTaskRequest, UpdateTaskRequest};
use crate::tasks::repo_types::{Task, TaskPatch};

pub const MAX_TITLE_CHARS: usize = 100;

fn validate_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::validation("title", "title is required"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::validation(
            "title",
            format!("title must be at most {MAX_TITLE_CHARS} characters"),
        ));
    }
    Ok(title.to_string())
}

/// New tasks are always stamped with the scope's owner.
#[instrument(skip(state, req), fields(owner = %scope.owner()))]
pub async fn create(
    state: &AppState,
    scope: OwnerScope,
    req: CreateTaskRequest,
) -> Result<Task, AppError> {
    let title = validate_title(req.title.as_deref().unwrap_or_default())?;
    let now = OffsetDateTime::now_utc();
    let task = state
        .tasks
        .insert(Task {
            id: Uuid::new_v4(),
            owner_id: scope.owner(),
            title,
            completed: false,
            created_at: now,
            updated_at: now,
        })
        .await?;
    info!(task_id = %task.id, "task created");
    Ok(task)
}

pub async fn list(state: &AppState, scope: OwnerScope) -> Result<Vec<Task>, AppError> {
    let tasks = state.tasks.list(scope).await?;
    debug!(owner = %scope.owner(), count = tasks.len(), "tasks listed");
    Ok(tasks)
}

pub async fn get(state: &AppState, scope: OwnerScope, id: Uuid) -> Result<Task, AppError> {
    state
        .tasks
        .find(scope, id)
        .await?
        .filter(|t| scope.permits(t.owner_id))
        .ok_or(AppError::NotFound("task"))
}

/// Applies only the supplied fields; `updated_at` moves regardless.
#[instrument(skip(state, req), fields(owner = %scope.owner()))]
pub async fn update(
    state: &AppState,
    scope: OwnerScope,
    id: Uuid,
    req: UpdateTaskRequest,
) -> Result<Task, AppError> {
    let patch = TaskPatch {
        title: req.title.as_deref().map(validate_title).transpose()?,
        completed: req.completed,
    };
    let task = state
        .tasks
        .update(scope, id, patch, OffsetDateTime::now_utc())
        .await?
        .filter(|t| scope.permits(t.owner_id))
        .ok_or(AppError::NotFound("task"))?;
    info!(task_id = %task.id, "task updated");
    Ok(task)
}

#[instrument(skip(state), fields(owner = %scope.owner()))]
pub async fn delete(state: &AppState, scope: OwnerScope, id: Uuid) -> Result<(), AppError> {
    if !state.tasks.delete(scope, id).await? {
        return Err(AppError::NotFound("task"));
    }
    info!(task_id = %id, "task deleted");
    Ok(())
}
