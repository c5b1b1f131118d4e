/// Task group endpoints
///
/// # Endpoints
///
/// - `POST /api/taskgroup` - Create a group from some of the caller's tasks
/// - `GET /api/taskgroup` - The caller's groups with their tasks
/// - `GET /api/taskgroup/:id` - One group with its tasks
/// - `DELETE /api/taskgroup/:id` - Delete a group (its tasks are kept, untagged)
/// - `PATCH /api/taskgroup-task-link` - Put a task into a group
/// - `DELETE /api/taskgroup-task-link` - Take a task out of a group
///
/// A task is in at most one group; linking it elsewhere moves it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    routes::MessageResponse,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use taskdeck_shared::{
    auth::gate::AuthContext,
    models::{
        task::Task,
        task_group::{CreateTaskGroup, TaskGroup},
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create group request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(max = 100, message = "Group name must be at most 100 characters"))]
    pub name: String,

    /// IDs of the caller's tasks to put in the group
    #[serde(default)]
    pub tasks: Vec<Uuid>,
}

/// Create group response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupResponse {
    pub message: String,
    pub group_id: Uuid,
}

/// Link or unlink request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLinkRequest {
    #[serde(alias = "task_id")]
    pub task_id: Uuid,

    #[serde(alias = "group_id")]
    pub group_id: Uuid,
}

/// A group together with its member tasks, in membership order
#[derive(Debug, Serialize, Deserialize)]
pub struct GroupWithTasks {
    #[serde(flatten)]
    pub group: TaskGroup,

    pub tasks: Vec<Task>,
}

fn group_not_found() -> ApiError {
    ApiError::NotFound("Group not found".to_string())
}

/// Create a group
///
/// # Endpoint
///
/// ```text
/// POST /api/taskgroup
/// Content-Type: application/json
///
/// { "name": "Sprint 1", "tasks": ["<task uuid>", "<task uuid>"] }
/// ```
///
/// # Response
///
/// ```json
/// { "message": "Group created", "groupId": "<uuid>" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Blank or long name, malformed task id
/// - `404 Not Found`: A listed task isn't the caller's
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<CreateGroupResponse>)> {
    req.validate()?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_field("name", "Group name is required"));
    }

    let group = state
        .store
        .create_group(CreateTaskGroup {
            name: name.to_string(),
            created_by: auth.user_id,
            task_ids: req.tasks,
        })
        .await?;

    info!(
        group_id = %group.id,
        tasks = group.task_ids.len(),
        "Task group created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateGroupResponse {
            message: "Group created".to_string(),
            group_id: group.id,
        }),
    ))
}

/// List the caller's groups with their tasks
pub async fn list_groups(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<GroupWithTasks>>> {
    let groups = state.store.list_groups(auth.user_id).await?;
    if groups.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let tasks: HashMap<Uuid, Task> = state
        .store
        .list_tasks(auth.user_id)
        .await?
        .into_iter()
        .map(|task| (task.id, task))
        .collect();

    let groups = groups
        .into_iter()
        .map(|group| {
            let members = group
                .task_ids
                .iter()
                .filter_map(|id| tasks.get(id).cloned())
                .collect();
            GroupWithTasks {
                group,
                tasks: members,
            }
        })
        .collect();

    Ok(Json(groups))
}

/// Get one group with its tasks
pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<GroupWithTasks>> {
    let group = state
        .store
        .find_group(id, auth.user_id)
        .await?
        .ok_or_else(group_not_found)?;

    let tasks = state
        .store
        .list_tasks_by_ids(auth.user_id, &group.task_ids)
        .await?;

    Ok(Json(GroupWithTasks { group, tasks }))
}

/// Delete a group
///
/// Member tasks survive with their group cleared.
pub async fn delete_group(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_group(id, auth.user_id).await? {
        return Err(group_not_found());
    }

    info!(group_id = %id, "Task group deleted");

    Ok(Json(MessageResponse::new("Group deleted successfully")))
}

/// Put a task into a group
///
/// # Endpoint
///
/// ```text
/// PATCH /api/taskgroup-task-link
/// Content-Type: application/json
///
/// { "taskId": "<uuid>", "groupId": "<uuid>" }
/// ```
///
/// Linking a task that is already a member changes nothing.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or malformed ids
/// - `404 Not Found`: Task or group isn't the caller's
pub async fn link_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<TaskLinkRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .store
        .link_task(req.group_id, req.task_id, auth.user_id)
        .await?;

    info!(task_id = %req.task_id, group_id = %req.group_id, "Task linked to group");

    Ok(Json(MessageResponse::new("Task added to group")))
}

/// Take a task out of a group
///
/// # Errors
///
/// - `400 Bad Request`: Missing or malformed ids
/// - `404 Not Found`: Task or group isn't the caller's, or the task isn't a member
pub async fn unlink_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<TaskLinkRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .store
        .unlink_task(req.group_id, req.task_id, auth.user_id)
        .await?;

    info!(task_id = %req.task_id, group_id = %req.group_id, "Task unlinked from group");

    Ok(Json(MessageResponse::new("Task removed from group")))
}
