use crate::dtos::{CreateProjectRequest, ProjectResponse, UpdateProjectRequest};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::Project;
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

/// Fetch a project by id and verify the caller owns it.
///
/// The null check always runs before the ownership check, so an unknown id is
/// 404 and never 500. Task routes resolve their authorization through this
/// helper as well: a task's effective owner is its parent project's owner.
pub(crate) async fn fetch_owned_project(
    db: &MongoDb,
    project_id: &str,
    user_id: &str,
) -> Result<Project, AppError> {
    let project = db
        .projects()
        .find_one(doc! { "_id": project_id }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project {} not found", project_id)))?;

    if project.owner_id != user_id {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "User is not authorized to access this project"
        )));
    }

    Ok(project)
}

pub async fn list_projects(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 }) // Newest first
        .build();

    let mut cursor = state
        .db
        .projects()
        .find(doc! { "owner_id": &claims.sub }, find_options)
        .await
        .map_err(AppError::from)?;

    let mut projects = Vec::new();
    while let Some(project) = cursor.try_next().await.map_err(AppError::from)? {
        projects.push(ProjectResponse::from(project));
    }

    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let project = fetch_owned_project(&state.db, &project_id, &claims.sub).await?;

    Ok(Json(ProjectResponse::from(project)))
}

pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let project = Project::new(claims.sub, payload.name, payload.description);

    state
        .db
        .projects()
        .insert_one(&project, None)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert project {} into database: {}", project.id, e);
            AppError::from(e)
        })?;

    tracing::info!(project_id = %project.id, "Project created");

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(project_id): Path<String>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    fetch_owned_project(&state.db, &project_id, &claims.sub).await?;

    let mut update = doc! { "updated_at": mongodb::bson::DateTime::now() };
    if let Some(name) = payload.name {
        update.insert("name", name);
    }
    if let Some(description) = payload.description {
        update.insert("description", description);
    }

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let updated = state
        .db
        .projects()
        .find_one_and_update(doc! { "_id": &project_id }, doc! { "$set": update }, options)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project {} not found", project_id)))?;

    tracing::info!(project_id = %project_id, "Project updated");

    Ok(Json(ProjectResponse::from(updated)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_project(&state.db, &project_id, &claims.sub).await?;

    let deleted = state
        .db
        .projects()
        .find_one_and_delete(doc! { "_id": &project_id }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project {} not found", project_id)))?;

    // A project's tasks go with it; the store never keeps orphaned tasks.
    let removed_tasks = state
        .db
        .tasks()
        .delete_many(doc! { "project_id": &project_id }, None)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to delete tasks of project {}: {}",
                project_id,
                e
            );
            AppError::from(e)
        })?;

    tracing::info!(
        project_id = %project_id,
        task_count = removed_tasks.deleted_count,
        "Project deleted"
    );

    Ok(Json(ProjectResponse::from(deleted)))
}
