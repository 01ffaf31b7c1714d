/// Task endpoints
///
/// # Endpoints
///
/// - `POST   /api/v1/tasks` - create (admin/manager only)
/// - `GET    /api/v1/tasks` - filtered/sorted/paginated list
/// - `GET    /api/v1/tasks/my-tasks` - the caller's assigned tasks
/// - `GET    /api/v1/tasks/dashboard` - aggregate statistics
/// - `GET    /api/v1/tasks/:id` - read (creator or assignee)
/// - `PATCH  /api/v1/tasks/:id` - update (creator only)
/// - `DELETE /api/v1/tasks/:id` - soft delete (creator only)
/// - `POST   /api/v1/tasks/:id/comments` - comment (creator or assignee)
///
/// All routes sit behind the authentication layer; ownership and role
/// checks happen before any write.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use taskforge_shared::auth::authorization;
use taskforge_shared::models::dashboard::DashboardStats;
use taskforge_shared::models::task::{NewTask, Task, TaskPage, TaskPriority, TaskStatus, TaskUpdate};
use taskforge_shared::models::user::UserRole;

use crate::{
    app::AppState,
    error::ApiResult,
    middleware::auth::CurrentUser,
    response::ApiResponse,
    services::{self, tasks::TaskListQuery},
};

/// Roles allowed to create tasks
const TASK_CREATOR_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Manager];

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    pub due_date: Option<DateTime<Utc>>,

    pub assigned_to: Uuid,

    #[serde(default)]
    pub tags: Vec<String>,

    #[validate(range(min = 0.0, max = 1000.0, message = "Estimated hours must be 0-1000"))]
    pub estimated_hours: Option<f64>,
}

/// Update request; all fields optional
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub tags: Option<Vec<String>>,

    #[validate(range(min = 0.0, max = 1000.0, message = "Estimated hours must be 0-1000"))]
    pub estimated_hours: Option<f64>,

    #[validate(range(min = 0.0, message = "Actual hours must be at least 0"))]
    pub actual_hours: Option<f64>,
}

/// Comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1-1000 characters"))]
    pub text: String,
}

/// `{ "task": ... }` payload wrapper
#[derive(Debug, Serialize)]
pub struct TaskEnvelope {
    pub task: Task,
}

/// Creates a task; the caller becomes the creator
///
/// # Errors
///
/// - `403` caller is not an admin or manager
/// - `404` assignee does not exist
pub async fn create_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    authorization::require_role(user.role, TASK_CREATOR_ROLES)?;

    let task = services::tasks::create_task(
        &state,
        NewTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            created_by: user.id,
            assigned_to: req.assigned_to,
            tags: req.tags,
            estimated_hours: req.estimated_hours,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Task created successfully",
            TaskEnvelope { task },
        )),
    ))
}

/// Filtered, sorted, paginated task list
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<ApiResponse<TaskPage>>> {
    query.validate()?;

    let page = services::tasks::list_tasks(&state, user.id, &query).await?;

    Ok(Json(ApiResponse::data(page)))
}

/// The caller's assigned tasks
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<ApiResponse<TaskPage>>> {
    query.validate()?;

    let page = services::tasks::my_tasks(&state, user.id, &query).await?;

    Ok(Json(ApiResponse::data(page)))
}

/// Aggregate statistics over the caller's assigned tasks
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<DashboardStats>>> {
    let stats = services::tasks::dashboard(&state, user.id).await?;

    Ok(Json(ApiResponse::data(stats)))
}

/// Reads a single task (creator or assignee)
pub async fn get_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<TaskEnvelope>>> {
    let task = services::tasks::get_task(&state, user.id, task_id).await?;

    Ok(Json(ApiResponse::data(TaskEnvelope { task })))
}

/// Partial update (creator only)
pub async fn update_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<ApiResponse<TaskEnvelope>>> {
    req.validate()?;

    let task = services::tasks::update_task(
        &state,
        user.id,
        task_id,
        TaskUpdate {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            assigned_to: req.assigned_to,
            tags: req.tags,
            estimated_hours: req.estimated_hours,
            actual_hours: req.actual_hours,
        },
    )
    .await?;

    Ok(Json(ApiResponse::with_message(
        "Task updated successfully",
        TaskEnvelope { task },
    )))
}

/// Soft delete (creator only)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    services::tasks::delete_task(&state, user.id, task_id).await?;

    Ok(Json(ApiResponse::message("Task deleted successfully")))
}

/// Appends a comment (creator or assignee)
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let task = services::tasks::add_comment(&state, user.id, task_id, req.text).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Comment added successfully",
            TaskEnvelope { task },
        )),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create() -> CreateTaskRequest {
        CreateTaskRequest {
            title: "Fix bug".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            due_date: None,
            assigned_to: Uuid::new_v4(),
            tags: vec![],
            estimated_hours: Some(4.0),
        }
    }

    #[test]
    fn test_create_validation_passes() {
        assert!(valid_create().validate().is_ok());
    }

    #[test]
    fn test_create_rejects_short_title() {
        let mut req = valid_create();
        req.title = "ab".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_rejects_excessive_hours() {
        let mut req = valid_create();
        req.estimated_hours = Some(1001.0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_defaults_from_json() {
        let req: CreateTaskRequest = serde_json::from_str(&format!(
            r#"{{"title": "Fix bug", "assigned_to": "{}"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();

        assert_eq!(req.status, TaskStatus::Todo);
        assert_eq!(req.priority, TaskPriority::Medium);
        assert!(req.tags.is_empty());
    }

    #[test]
    fn test_comment_bounds() {
        assert!(CommentRequest { text: "ok".to_string() }.validate().is_ok());
        assert!(CommentRequest { text: String::new() }.validate().is_err());
        assert!(CommentRequest {
            text: "x".repeat(1001)
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_update_request_all_optional() {
        let req: UpdateTaskRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_ok());
        assert!(req.title.is_none());
        assert!(req.status.is_none());
    }

    #[test]
    fn test_creator_roles() {
        assert!(authorization::require_role(UserRole::Admin, TASK_CREATOR_ROLES).is_ok());
        assert!(authorization::require_role(UserRole::Manager, TASK_CREATOR_ROLES).is_ok());
        assert!(authorization::require_role(UserRole::User, TASK_CREATOR_ROLES).is_err());
    }
}
