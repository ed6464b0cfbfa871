use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser, handlers::parse_id},
    error::AppError,
    state::AppState,
    tasks::{
        dto::{CreateTaskRequest, TaskResponse, UpdateTaskRequest},
        services,
    },
};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_tasks).post(create_task))
        .route("/todos/", get(list_tasks).post(create_task))
        .route(
            "/todos/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let tasks = services::list(&state, user.scope()).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, AppError> {
    let id = parse_id(&id)?;
    let task = services::get(&state, user.scope(), id).await?;
    Ok(Json(task.into()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.user_id))]
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, AppError> {
    let Json(payload) = payload?;
    let task = services::create(&state, user.scope(), payload).await?;
    Ok(Json(task.into()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.user_id))]
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, AppError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let task = services::update(&state, user.scope(), id, payload).await?;
    Ok(Json(task.into()))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    services::delete(&state, user.scope(), id).await?;
    Ok(Json(MessageResponse::new("task deleted")))
}
