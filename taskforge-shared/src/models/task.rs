/// Task model, single save path, and the filtered query engine
///
/// Tasks carry their comments and attachments as embedded JSONB documents
/// and are soft-deleted: `is_deleted` rows are excluded from every query in
/// this module unconditionally.
///
/// Status is the source of truth for completion. `is_completed` and
/// `completed_at` are derived from it in [`Task::sync_completion`], which
/// runs on the single save path ([`Task::create`] and [`Task::save`]) so
/// the two can never drift apart.
///
/// Concurrent updates to the same task race: a save replaces the whole set
/// of mutable columns, last write wins. That is accepted behavior, not a
/// guarantee to defend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// Comment embedded in a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskComment {
    pub author: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Attachment metadata embedded in a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAttachment {
    pub filename: String,
    pub url: String,
    pub size: i64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Task row with embedded documents
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub assigned_to: Uuid,
    pub tags: Vec<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,

    /// Derived: true iff `status == Done`; maintained by the save path
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,

    pub comments: Json<Vec<TaskComment>>,
    pub attachments: Json<Vec<TaskAttachment>>,

    #[serde(skip_serializing)]
    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Deserialize is only needed for cached copies; FromRow covers the database
// path.
impl<'de> Deserialize<'de> for Task {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TaskDoc {
            id: Uuid,
            title: String,
            description: Option<String>,
            status: TaskStatus,
            priority: TaskPriority,
            due_date: Option<DateTime<Utc>>,
            created_by: Uuid,
            assigned_to: Uuid,
            tags: Vec<String>,
            estimated_hours: Option<f64>,
            actual_hours: f64,
            is_completed: bool,
            completed_at: Option<DateTime<Utc>>,
            comments: Vec<TaskComment>,
            attachments: Vec<TaskAttachment>,
            created_at: DateTime<Utc>,
            updated_at: DateTime<Utc>,
        }

        let doc = TaskDoc::deserialize(deserializer)?;
        Ok(Task {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            status: doc.status,
            priority: doc.priority,
            due_date: doc.due_date,
            created_by: doc.created_by,
            assigned_to: doc.assigned_to,
            tags: doc.tags,
            estimated_hours: doc.estimated_hours,
            actual_hours: doc.actual_hours,
            is_completed: doc.is_completed,
            completed_at: doc.completed_at,
            comments: Json(doc.comments),
            attachments: Json(doc.attachments),
            // Cached copies are always live rows.
            is_deleted: false,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub assigned_to: Uuid,
    pub tags: Vec<String>,
    pub estimated_hours: Option<f64>,
}

/// Partial task update; only `Some` fields are applied
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

/// Equality and containment predicates for task queries
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,

    /// All listed tags must be present on the task
    pub tags: Vec<String>,

    /// Case-insensitive substring match on title OR description
    pub search: Option<String>,
}

/// Whitelisted sort columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    DueDate,
    Priority,
    Status,
    Title,
}

impl SortField {
    /// Column name; sort fields are an enum so this never interpolates
    /// user input into SQL.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::DueDate => "due_date",
            SortField::Priority => "priority",
            SortField::Status => "status",
            SortField::Title => "title",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Sort specification with the default ordering (newest first)
#[derive(Debug, Clone, Copy)]
pub struct TaskSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for TaskSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

/// One page of task results plus the total for pagination UIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub items: Vec<Task>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

pub(crate) const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, created_by, \
     assigned_to, tags, estimated_hours, actual_hours, is_completed, completed_at, \
     comments, attachments, is_deleted, created_at, updated_at";

/// Builds the WHERE clause for a filter. Placeholders are numbered from
/// `$1`; returns the clause and the next free placeholder index. Bind
/// order must match [`Task::list`]: status, priority, assigned_to,
/// created_by, tags, search.
fn filter_where(filter: &TaskFilter) -> (String, usize) {
    let mut sql = String::from(" WHERE is_deleted = FALSE");
    let mut next = 1;

    if filter.status.is_some() {
        sql.push_str(&format!(" AND status = ${}", next));
        next += 1;
    }
    if filter.priority.is_some() {
        sql.push_str(&format!(" AND priority = ${}", next));
        next += 1;
    }
    if filter.assigned_to.is_some() {
        sql.push_str(&format!(" AND assigned_to = ${}", next));
        next += 1;
    }
    if filter.created_by.is_some() {
        sql.push_str(&format!(" AND created_by = ${}", next));
        next += 1;
    }
    if !filter.tags.is_empty() {
        sql.push_str(&format!(" AND tags @> ${}", next));
        next += 1;
    }
    if filter.search.is_some() {
        sql.push_str(&format!(
            " AND (title ILIKE ${n} OR description ILIKE ${n})",
            n = next
        ));
        next += 1;
    }

    (sql, next)
}

impl Task {
    /// Derives `is_completed`/`completed_at` from `status`
    ///
    /// The only place the completion flag is written; runs on every save.
    pub fn sync_completion(&mut self) {
        if self.status == TaskStatus::Done && !self.is_completed {
            self.is_completed = true;
            self.completed_at = Some(Utc::now());
        } else if self.status != TaskStatus::Done && self.is_completed {
            self.is_completed = false;
            self.completed_at = None;
        }
    }

    /// Merges a partial update into the task and re-derives completion
    pub fn apply_update(&mut self, update: TaskUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(assigned_to) = update.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(tags) = update.tags {
            self.tags = tags.into_iter().map(|t| t.to_lowercase()).collect();
        }
        if let Some(estimated_hours) = update.estimated_hours {
            self.estimated_hours = Some(estimated_hours);
        }
        if let Some(actual_hours) = update.actual_hours {
            self.actual_hours = actual_hours;
        }

        self.sync_completion();
    }

    /// Whether the task is past due and not completed
    pub fn is_overdue(&self) -> bool {
        match self.due_date {
            Some(due) if !self.is_completed => due < Utc::now(),
            _ => false,
        }
    }

    /// Appends a comment; persisted by the next [`Task::save`]
    pub fn push_comment(&mut self, author: Uuid, text: String) {
        self.comments.0.push(TaskComment {
            author,
            text,
            created_at: Utc::now(),
        });
    }

    /// Creates a task with completion derived from the initial status
    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Self, sqlx::Error> {
        let is_completed = data.status == TaskStatus::Done;
        let completed_at = is_completed.then(Utc::now);
        let tags: Vec<String> = data.tags.into_iter().map(|t| t.to_lowercase()).collect();

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, status, priority, due_date,
                               created_by, assigned_to, tags, estimated_hours,
                               is_completed, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.created_by)
        .bind(data.assigned_to)
        .bind(tags)
        .bind(data.estimated_hours)
        .bind(is_completed)
        .bind(completed_at)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a live (not soft-deleted) task by id
    pub async fn find_active_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND is_deleted = FALSE",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Persists the task's mutable columns
    ///
    /// Whole-row replace: concurrent saves of the same task are
    /// last-write-wins. Callers mutate the struct (via [`Task::apply_update`]
    /// or [`Task::push_comment`]) and then save.
    pub async fn save(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, priority = $5,
                due_date = $6, assigned_to = $7, tags = $8,
                estimated_hours = $9, actual_hours = $10,
                is_completed = $11, completed_at = $12,
                comments = $13, attachments = $14,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(self.id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.status)
        .bind(self.priority)
        .bind(self.due_date)
        .bind(self.assigned_to)
        .bind(&self.tags)
        .bind(self.estimated_hours)
        .bind(self.actual_hours)
        .bind(self.is_completed)
        .bind(self.completed_at)
        .bind(&self.comments)
        .bind(&self.attachments)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Soft-deletes a task; the row stays for history but disappears from
    /// every query in this module
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Runs a filtered, sorted, paginated query and returns the page plus
    /// the total match count
    ///
    /// `page` is 1-based; `limit` is clamped to 1..=100.
    pub async fn list(
        pool: &PgPool,
        filter: &TaskFilter,
        sort: TaskSort,
        page: i64,
        limit: i64,
    ) -> Result<TaskPage, sqlx::Error> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let (where_sql, next) = filter_where(filter);
        let search_pattern = filter.search.as_ref().map(|s| format!("%{}%", s));

        let count_sql = format!("SELECT COUNT(*) FROM tasks{where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(status) = filter.status {
            count_query = count_query.bind(status);
        }
        if let Some(priority) = filter.priority {
            count_query = count_query.bind(priority);
        }
        if let Some(assigned_to) = filter.assigned_to {
            count_query = count_query.bind(assigned_to);
        }
        if let Some(created_by) = filter.created_by {
            count_query = count_query.bind(created_by);
        }
        if !filter.tags.is_empty() {
            count_query = count_query.bind(&filter.tags);
        }
        if let Some(ref pattern) = search_pattern {
            count_query = count_query.bind(pattern);
        }
        let total = count_query.fetch_one(pool).await?;

        let select_sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks{where_sql} ORDER BY {} {} LIMIT ${} OFFSET ${}",
            sort.field.column(),
            sort.order.keyword(),
            next,
            next + 1,
        );
        let mut select_query = sqlx::query_as::<_, Task>(&select_sql);
        if let Some(status) = filter.status {
            select_query = select_query.bind(status);
        }
        if let Some(priority) = filter.priority {
            select_query = select_query.bind(priority);
        }
        if let Some(assigned_to) = filter.assigned_to {
            select_query = select_query.bind(assigned_to);
        }
        if let Some(created_by) = filter.created_by {
            select_query = select_query.bind(created_by);
        }
        if !filter.tags.is_empty() {
            select_query = select_query.bind(&filter.tags);
        }
        if let Some(ref pattern) = search_pattern {
            select_query = select_query.bind(pattern);
        }
        let items = select_query.bind(limit).bind(offset).fetch_all(pool).await?;

        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };

        Ok(TaskPage {
            items,
            total,
            page,
            limit,
            total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Fix bug".to_string(),
            description: Some("Crash on startup".to_string()),
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            due_date: None,
            created_by: Uuid::new_v4(),
            assigned_to: Uuid::new_v4(),
            tags: vec!["backend".to_string()],
            estimated_hours: Some(4.0),
            actual_hours: 0.0,
            is_completed: false,
            completed_at: None,
            comments: Json(Vec::new()),
            attachments: Json(Vec::new()),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sync_completion_into_done() {
        let mut task = sample_task();
        task.status = TaskStatus::Done;
        task.sync_completion();

        assert!(task.is_completed);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_sync_completion_away_from_done() {
        let mut task = sample_task();
        task.status = TaskStatus::Done;
        task.sync_completion();

        task.status = TaskStatus::Review;
        task.sync_completion();

        assert!(!task.is_completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_sync_completion_is_idempotent() {
        let mut task = sample_task();
        task.status = TaskStatus::Done;
        task.sync_completion();
        let completed_at = task.completed_at;

        task.sync_completion();
        assert!(task.is_completed);
        assert_eq!(task.completed_at, completed_at);
    }

    #[test]
    fn test_apply_update_derives_completion() {
        let mut task = sample_task();

        task.apply_update(TaskUpdate {
            status: Some(TaskStatus::Done),
            ..Default::default()
        });
        assert!(task.is_completed);

        task.apply_update(TaskUpdate {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        });
        assert!(!task.is_completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_apply_update_merges_only_present_fields() {
        let mut task = sample_task();
        let original_title = task.title.clone();

        task.apply_update(TaskUpdate {
            priority: Some(TaskPriority::Critical),
            tags: Some(vec!["Frontend".to_string(), "UI".to_string()]),
            ..Default::default()
        });

        assert_eq!(task.title, original_title);
        assert_eq!(task.priority, TaskPriority::Critical);
        // Tags are normalized to lowercase.
        assert_eq!(task.tags, vec!["frontend".to_string(), "ui".to_string()]);
    }

    #[test]
    fn test_is_overdue() {
        let mut task = sample_task();
        assert!(!task.is_overdue(), "No due date means never overdue");

        task.due_date = Some(Utc::now() - chrono::Duration::days(1));
        assert!(task.is_overdue());

        task.status = TaskStatus::Done;
        task.sync_completion();
        assert!(!task.is_overdue(), "Completed tasks are not overdue");

        let mut future = sample_task();
        future.due_date = Some(Utc::now() + chrono::Duration::days(1));
        assert!(!future.is_overdue());
    }

    #[test]
    fn test_push_comment() {
        let mut task = sample_task();
        let author = Uuid::new_v4();

        task.push_comment(author, "Looks good".to_string());

        assert_eq!(task.comments.0.len(), 1);
        assert_eq!(task.comments.0[0].author, author);
        assert_eq!(task.comments.0[0].text, "Looks good");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            r#""in_progress""#
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>(r#""done""#).unwrap(),
            TaskStatus::Done
        );
        assert_eq!(
            serde_json::to_string(&TaskPriority::Critical).unwrap(),
            r#""critical""#
        );
    }

    #[test]
    fn test_filter_where_empty() {
        let (sql, next) = filter_where(&TaskFilter::default());
        assert_eq!(sql, " WHERE is_deleted = FALSE");
        assert_eq!(next, 1);
    }

    #[test]
    fn test_filter_where_all_predicates() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Todo),
            priority: Some(TaskPriority::High),
            assigned_to: Some(Uuid::new_v4()),
            created_by: Some(Uuid::new_v4()),
            tags: vec!["backend".to_string()],
            search: Some("bug".to_string()),
        };

        let (sql, next) = filter_where(&filter);

        assert!(sql.starts_with(" WHERE is_deleted = FALSE"));
        assert!(sql.contains("status = $1"));
        assert!(sql.contains("priority = $2"));
        assert!(sql.contains("assigned_to = $3"));
        assert!(sql.contains("created_by = $4"));
        assert!(sql.contains("tags @> $5"));
        assert!(sql.contains("(title ILIKE $6 OR description ILIKE $6)"));
        assert_eq!(next, 7);
    }

    #[test]
    fn test_filter_where_search_only() {
        let filter = TaskFilter {
            search: Some("bug".to_string()),
            ..Default::default()
        };

        let (sql, next) = filter_where(&filter);
        assert!(sql.contains("(title ILIKE $1 OR description ILIKE $1)"));
        assert_eq!(next, 2);
    }

    #[test]
    fn test_sort_whitelist() {
        assert_eq!(SortField::CreatedAt.column(), "created_at");
        assert_eq!(SortField::DueDate.column(), "due_date");
        assert_eq!(SortField::Title.column(), "title");
        assert_eq!(SortOrder::Asc.keyword(), "ASC");
        assert_eq!(SortOrder::Desc.keyword(), "DESC");

        let sort = TaskSort::default();
        assert_eq!(sort.field, SortField::CreatedAt);
        assert_eq!(sort.order, SortOrder::Desc);
    }

    #[test]
    fn test_task_serialization_roundtrip() {
        let mut task = sample_task();
        task.push_comment(Uuid::new_v4(), "first".to_string());

        let json = serde_json::to_string(&task).unwrap();
        let restored: Task = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id, task.id);
        assert_eq!(restored.status, task.status);
        assert_eq!(restored.comments.0.len(), 1);
        assert!(!restored.is_deleted);
    }

    #[test]
    fn test_soft_deleted_flag_not_serialized() {
        let task = sample_task();
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("is_deleted").is_none());
    }
}
