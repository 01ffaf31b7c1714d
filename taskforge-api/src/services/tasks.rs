/// Task operations: CRUD, lists, comments, dashboard
///
/// This module owns the read-through caching and the write-side
/// invalidation for task data:
///
/// - Single tasks cache under `task:<id>` and invalidate by exact key.
/// - List pages cache under `tasks:<uid>:<query>` / `mytasks:<uid>:<query>`
///   and invalidate by glob, since the query fragment in the key cannot be
///   enumerated.
/// - Dashboards cache under `dashboard:<uid>` and invalidate by exact key.
///
/// Every write clears the list and dashboard namespaces of all affected
/// users (creator and assignees) before returning. Ownership checks run
/// before any side-effecting operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use taskforge_shared::auth::authorization;
use taskforge_shared::cache::keys;
use taskforge_shared::models::dashboard::DashboardStats;
use taskforge_shared::models::task::{
    NewTask, SortField, SortOrder, Task, TaskFilter, TaskPage, TaskPriority, TaskSort, TaskStatus,
    TaskUpdate,
};
use taskforge_shared::models::user::User;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// TTL for task, list, and dashboard caches. Short: task data changes
/// often and staleness past the invalidation globs must stay brief.
const TASK_CACHE_TTL: u64 = 300;

/// List query parameters: filters, sort, pagination
///
/// Serialized verbatim into cache keys, so equal queries share an entry
/// and any difference produces a distinct key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,

    /// Comma-separated tags; a task must carry all of them
    pub tags: Option<String>,

    /// Case-insensitive substring search over title and description
    pub search: Option<String>,

    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,

    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

impl TaskListQuery {
    fn filter(&self) -> TaskFilter {
        TaskFilter {
            status: self.status,
            priority: self.priority,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
            tags: self
                .tags
                .as_deref()
                .map(|raw| {
                    raw.split(',')
                        .map(|t| t.trim().to_lowercase())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            search: self.search.clone(),
        }
    }

    fn sort(&self) -> TaskSort {
        let default = TaskSort::default();
        TaskSort {
            field: self.sort_by.unwrap_or(default.field),
            order: self.order.unwrap_or(default.order),
        }
    }

    fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    fn limit(&self) -> i64 {
        self.limit.unwrap_or(10)
    }

    /// Deterministic cache-key fragment. Struct fields serialize in
    /// declaration order, so equal queries always produce equal fragments.
    fn cache_fragment(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates a task; the creator is the calling user
///
/// # Errors
///
/// - `NotFound` when the assignee does not exist
pub async fn create_task(state: &AppState, data: NewTask) -> ApiResult<Task> {
    if User::find_by_id(&state.db, data.assigned_to).await?.is_none() {
        return Err(ApiError::NotFound("Assigned user not found".to_string()));
    }

    let task = Task::create(&state.db, data).await?;

    clear_task_caches(state, &[task.created_by, task.assigned_to]).await;

    tracing::info!(
        task_id = %task.id,
        created_by = %task.created_by,
        assigned_to = %task.assigned_to,
        title = %task.title,
        "Task created"
    );

    Ok(task)
}

/// Filtered, sorted, paginated task list, read through the cache
pub async fn list_tasks(
    state: &AppState,
    user_id: Uuid,
    query: &TaskListQuery,
) -> ApiResult<TaskPage> {
    let cache_key = keys::task_list(user_id, &query.cache_fragment());

    if let Some(page) = state.cache.get_json::<TaskPage>(&cache_key).await {
        return Ok(page);
    }

    let page = Task::list(
        &state.db,
        &query.filter(),
        query.sort(),
        query.page(),
        query.limit(),
    )
    .await?;

    state.cache.set_json(&cache_key, &page, TASK_CACHE_TTL).await;

    tracing::debug!(
        user_id = %user_id,
        total = page.total,
        page = page.page,
        "Tasks fetched from database"
    );

    Ok(page)
}

/// The caller's assigned tasks; same query surface as [`list_tasks`] with
/// the assignee pinned to the caller
pub async fn my_tasks(
    state: &AppState,
    user_id: Uuid,
    query: &TaskListQuery,
) -> ApiResult<TaskPage> {
    let cache_key = keys::my_tasks(user_id, &query.cache_fragment());

    if let Some(page) = state.cache.get_json::<TaskPage>(&cache_key).await {
        return Ok(page);
    }

    let mut filter = query.filter();
    filter.assigned_to = Some(user_id);

    let page = Task::list(&state.db, &filter, query.sort(), query.page(), query.limit()).await?;

    state.cache.set_json(&cache_key, &page, TASK_CACHE_TTL).await;

    Ok(page)
}

/// Reads a single task, creator or assignee only
///
/// The ownership check runs on cache hits too; a cached task is no more
/// public than a stored one.
pub async fn get_task(state: &AppState, user_id: Uuid, task_id: Uuid) -> ApiResult<Task> {
    let cache_key = keys::task(task_id);

    if let Some(task) = state.cache.get_json::<Task>(&cache_key).await {
        authorization::require_task_view(&task, user_id)?;
        return Ok(task);
    }

    let task = Task::find_active_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorization::require_task_view(&task, user_id)?;

    state.cache.set_json(&cache_key, &task, TASK_CACHE_TTL).await;

    Ok(task)
}

/// Applies a partial update, creator only
///
/// # Errors
///
/// - `NotFound` for a missing/soft-deleted task or an unknown new assignee
/// - `Forbidden` when the caller did not create the task
pub async fn update_task(
    state: &AppState,
    user_id: Uuid,
    task_id: Uuid,
    update: TaskUpdate,
) -> ApiResult<Task> {
    let mut task = Task::find_active_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorization::require_task_creator(&task, user_id)?;

    if let Some(new_assignee) = update.assigned_to {
        if new_assignee != task.assigned_to
            && User::find_by_id(&state.db, new_assignee).await?.is_none()
        {
            return Err(ApiError::NotFound("Assigned user not found".to_string()));
        }
    }

    let previous_assignee = task.assigned_to;
    task.apply_update(update);
    let saved = task.save(&state.db).await?;

    // Reassignment affects three users' lists: creator, old assignee, new.
    clear_task_caches(
        state,
        &[saved.created_by, previous_assignee, saved.assigned_to],
    )
    .await;
    state.cache.del(&keys::task(task_id)).await;

    tracing::info!(task_id = %task_id, updated_by = %user_id, "Task updated");

    Ok(saved)
}

/// Soft-deletes a task, creator only
pub async fn delete_task(state: &AppState, user_id: Uuid, task_id: Uuid) -> ApiResult<()> {
    let task = Task::find_active_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorization::require_task_creator(&task, user_id)?;

    Task::soft_delete(&state.db, task_id).await?;

    clear_task_caches(state, &[task.created_by, task.assigned_to]).await;
    state.cache.del(&keys::task(task_id)).await;

    tracing::info!(task_id = %task_id, deleted_by = %user_id, "Task deleted");

    Ok(())
}

/// Appends a comment, creator or assignee only
pub async fn add_comment(
    state: &AppState,
    user_id: Uuid,
    task_id: Uuid,
    text: String,
) -> ApiResult<Task> {
    let mut task = Task::find_active_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorization::require_task_participant(&task, user_id)?;

    task.push_comment(user_id, text);
    let saved = task.save(&state.db).await?;

    state.cache.del(&keys::task(task_id)).await;

    tracing::info!(task_id = %task_id, commented_by = %user_id, "Comment added to task");

    Ok(saved)
}

/// Dashboard statistics for the caller, read through the cache
///
/// The aggregate is expensive (eight queries) and slightly stale data is
/// acceptable, so it caches for the full TTL.
pub async fn dashboard(state: &AppState, user_id: Uuid) -> ApiResult<DashboardStats> {
    let cache_key = keys::dashboard(user_id);

    if let Some(stats) = state.cache.get_json::<DashboardStats>(&cache_key).await {
        return Ok(stats);
    }

    let stats = DashboardStats::compute(&state.db, user_id).await?;

    state.cache.set_json(&cache_key, &stats, TASK_CACHE_TTL).await;

    tracing::debug!(user_id = %user_id, "Dashboard stats generated");

    Ok(stats)
}

/// Invalidates the list and dashboard caches of every affected user
///
/// Dashboards are exact keys; list namespaces are glob-cleared because
/// their keys embed arbitrary query fragments.
async fn clear_task_caches(state: &AppState, user_ids: &[Uuid]) {
    let mut seen = Vec::with_capacity(user_ids.len());

    for &user_id in user_ids {
        if seen.contains(&user_id) {
            continue;
        }
        seen.push(user_id);

        state.cache.del(&keys::dashboard(user_id)).await;
        state.cache.clear_pattern(&keys::task_list_pattern(user_id)).await;
        state.cache.clear_pattern(&keys::my_tasks_pattern(user_id)).await;
    }

    tracing::debug!(users = ?seen, "Task caches cleared");
}
