use crate::dtos::{CreateTaskRequest, TaskResponse, UpdateTaskRequest};
use crate::error::AppError;
use crate::handlers::projects::fetch_owned_project;
use crate::middleware::AuthUser;
use crate::models::Task;
use crate::services::MongoDb;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use validator::Validate;

/// Fetch a task by id and verify the caller owns its parent project.
async fn fetch_owned_task(db: &MongoDb, task_id: &str, user_id: &str) -> Result<Task, AppError> {
    let task = db
        .tasks()
        .find_one(doc! { "_id": task_id }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task {} not found", task_id)))?;

    fetch_owned_project(db, &task.project_id, user_id).await?;

    Ok(task)
}

pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_project(&state.db, &project_id, &claims.sub).await?;

    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": 1 }) // Creation order
        .build();

    let mut cursor = state
        .db
        .tasks()
        .find(doc! { "project_id": &project_id }, find_options)
        .await
        .map_err(AppError::from)?;

    let mut tasks = Vec::new();
    while let Some(task) = cursor.try_next().await.map_err(AppError::from)? {
        tasks.push(TaskResponse::from(task));
    }

    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(project_id): Path<String>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let project = fetch_owned_project(&state.db, &project_id, &claims.sub).await?;

    let task = Task::new(project.id, payload.title, payload.completed.unwrap_or(false));

    state
        .db
        .tasks()
        .insert_one(&task, None)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert task {} into database: {}", task.id, e);
            AppError::from(e)
        })?;

    tracing::info!(task_id = %task.id, project_id = %task.project_id, "Task created");

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(task_id): Path<String>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    fetch_owned_task(&state.db, &task_id, &claims.sub).await?;

    let mut update = doc! { "updated_at": mongodb::bson::DateTime::now() };
    if let Some(title) = payload.title {
        update.insert("title", title);
    }
    if let Some(completed) = payload.completed {
        update.insert("completed", completed);
    }

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let updated = state
        .db
        .tasks()
        .find_one_and_update(doc! { "_id": &task_id }, doc! { "$set": update }, options)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task {} not found", task_id)))?;

    tracing::info!(task_id = %task_id, "Task updated");

    Ok(Json(TaskResponse::from(updated)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_task(&state.db, &task_id, &claims.sub).await?;

    let deleted = state
        .db
        .tasks()
        .find_one_and_delete(doc! { "_id": &task_id }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task {} not found", task_id)))?;

    tracing::info!(task_id = %task_id, "Task deleted");

    Ok(Json(TaskResponse::from(deleted)))
}
