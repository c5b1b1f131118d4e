/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/tasks` - The caller's tasks, oldest first
/// - `POST /api/tasks` - Create a task
/// - `GET /api/tasks/:id` - One task
/// - `PUT /api/tasks/:id` - Update title, description, or completion
/// - `DELETE /api/tasks/:id` - Delete a task
///
/// Tasks of other users answer `404`, exactly like missing ones. Group
/// membership is changed through `/api/taskgroup-task-link`, never here.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    routes::MessageResponse,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use taskdeck_shared::{
    auth::gate::AuthContext,
    models::task::{CreateTask, Task, UpdateTask},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,
}

/// Update task request
///
/// At least one field must be present.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub completed: Option<bool>,
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// Rejects titles that are empty once trimmed
fn require_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::invalid_field("title", "Title is required"));
    }
    Ok(title.to_string())
}

/// List the caller's tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.store.list_tasks(auth.user_id).await?;
    Ok(Json(tasks))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks
/// Content-Type: application/json
///
/// { "title": "T1", "description": "optional" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing or blank title, or a field is too long
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;
    let title = require_title(&req.title)?;

    let task = state
        .store
        .create_task(CreateTask {
            owner_id: auth.user_id,
            title,
            description: req.description,
        })
        .await?;

    info!(task_id = %task.id, owner_id = %auth.user_id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Get one task
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state
        .store
        .find_task(id, auth.user_id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(task))
}

/// Update a task
///
/// # Errors
///
/// - `400 Bad Request`: No fields, blank title, or a field is too long
/// - `404 Not Found`: No such task for the caller
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let update = UpdateTask {
        title: req.title.as_deref().map(require_title).transpose()?,
        description: req.description,
        completed: req.completed,
    };
    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let task = state
        .store
        .update_task(id, auth.user_id, update)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(task))
}

/// Delete a task
///
/// Deleting again answers `404`.
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_task(id, auth.user_id).await? {
        return Err(task_not_found());
    }

    info!(task_id = %id, owner_id = %auth.user_id, "Task deleted");

    Ok(Json(MessageResponse::new("Task deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_title_trims_and_rejects_blank() {
        assert_eq!(require_title("  T1 ").unwrap(), "T1");
        assert!(matches!(
            require_title("   "),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[test]
    fn test_create_request_description_defaults_empty() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"title":"T1"}"#).unwrap();
        assert_eq!(req.description, "");
        assert!(req.validate().is_ok());

        let long = format!(r#"{{"title":"{}"}}"#, "x".repeat(201));
        let req: CreateTaskRequest = serde_json::from_str(&long).unwrap();
        assert!(req.validate().is_err());
    }
}
