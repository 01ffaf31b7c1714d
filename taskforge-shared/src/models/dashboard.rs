/// Per-user dashboard statistics
///
/// Aggregates a user's assigned tasks into the numbers the dashboard
/// renders: totals, completion rate, overdue count, the five most recent
/// tasks, status/priority breakdowns, and a day-bucketed activity series
/// for the trailing week. The component queries run concurrently; they
/// are independent reads against the same pool.
///
/// Computation is relatively expensive (eight queries), so callers cache
/// the result with a short TTL; slightly stale numbers are acceptable
/// here.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::task::{Task, TaskStatus, TASK_COLUMNS};

/// Aggregated dashboard statistics for one user (as assignee)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub in_progress_tasks: i64,

    /// Tasks past their due date and not done
    pub overdue_tasks: i64,

    /// Percentage of assigned tasks that are done, rounded
    pub completion_rate: i64,

    /// Five most recently created tasks
    pub recent_tasks: Vec<Task>,

    /// Counts keyed by status value ("todo", "in_progress", ...)
    pub tasks_by_status: HashMap<String, i64>,

    /// Counts keyed by priority value ("low", ..., "critical")
    pub tasks_by_priority: HashMap<String, i64>,

    /// Counts of tasks touched per day over the trailing 7 days,
    /// keyed "YYYY-MM-DD" by last-update time
    pub weekly_activity: HashMap<String, i64>,
}

/// Rounded completion percentage; 0 when there are no tasks.
pub fn completion_rate(completed: i64, total: i64) -> i64 {
    if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as i64
    } else {
        0
    }
}

impl DashboardStats {
    /// Computes dashboard statistics for a user
    ///
    /// All component queries exclude soft-deleted tasks and run
    /// concurrently via `tokio::try_join!`.
    pub async fn compute(pool: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        let week_ago = start_of_day(Utc::now() - Duration::days(7));

        let (
            total_tasks,
            completed_tasks,
            in_progress_tasks,
            overdue_tasks,
            recent_tasks,
            by_status,
            by_priority,
            weekly,
        ) = tokio::try_join!(
            count_assigned(pool, user_id, None),
            count_assigned(pool, user_id, Some(TaskStatus::Done)),
            count_assigned(pool, user_id, Some(TaskStatus::InProgress)),
            count_overdue(pool, user_id),
            recent_assigned(pool, user_id, 5),
            group_by_status(pool, user_id),
            group_by_priority(pool, user_id),
            weekly_activity(pool, user_id, week_ago),
        )?;

        Ok(Self {
            completion_rate: completion_rate(completed_tasks, total_tasks),
            total_tasks,
            completed_tasks,
            in_progress_tasks,
            overdue_tasks,
            recent_tasks,
            tasks_by_status: by_status
                .into_iter()
                .map(|(status, count)| (status.as_str().to_string(), count))
                .collect(),
            tasks_by_priority: by_priority
                .into_iter()
                .map(|(priority, count)| (priority.as_str().to_string(), count))
                .collect(),
            weekly_activity: weekly.into_iter().collect(),
        })
    }
}

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

async fn count_assigned(
    pool: &PgPool,
    user_id: Uuid,
    status: Option<TaskStatus>,
) -> Result<i64, sqlx::Error> {
    match status {
        Some(status) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM tasks \
                 WHERE assigned_to = $1 AND is_deleted = FALSE AND status = $2",
            )
            .bind(user_id)
            .bind(status)
            .fetch_one(pool)
            .await
        }
        None => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM tasks WHERE assigned_to = $1 AND is_deleted = FALSE",
            )
            .bind(user_id)
            .fetch_one(pool)
            .await
        }
    }
}

async fn count_overdue(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks \
         WHERE assigned_to = $1 AND is_deleted = FALSE \
           AND due_date < NOW() AND status <> 'done'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

async fn recent_assigned(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks \
         WHERE assigned_to = $1 AND is_deleted = FALSE \
         ORDER BY created_at DESC LIMIT $2",
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

async fn group_by_status(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<(TaskStatus, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT status, COUNT(*) FROM tasks \
         WHERE assigned_to = $1 AND is_deleted = FALSE \
         GROUP BY status",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

async fn group_by_priority(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<(super::task::TaskPriority, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT priority, COUNT(*) FROM tasks \
         WHERE assigned_to = $1 AND is_deleted = FALSE \
         GROUP BY priority",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

async fn weekly_activity(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT TO_CHAR(updated_at, 'YYYY-MM-DD') AS day, COUNT(*) FROM tasks \
         WHERE assigned_to = $1 AND is_deleted = FALSE AND updated_at >= $2 \
         GROUP BY day ORDER BY day",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await
}
