/// Role and ownership checks
///
/// Authorization is evaluated after authentication and must short-circuit
/// before any side-effecting operation. Two kinds of check exist:
///
/// - **Role-based**: a route requires membership in an enumerated role set
///   (e.g. only admins and managers create tasks).
/// - **Ownership-based**: task mutation is permitted only to the creator;
///   reading and commenting to the creator or assignee.
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::auth::authorization::{require_role, require_task_creator};
/// use taskforge_shared::models::user::UserRole;
/// # use taskforge_shared::models::task::Task;
/// # use uuid::Uuid;
///
/// # fn example(task: &Task, user_id: Uuid, role: UserRole) -> Result<(), Box<dyn std::error::Error>> {
/// require_role(role, &[UserRole::Admin, UserRole::Manager])?;
/// require_task_creator(task, user_id)?;
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use crate::models::task::Task;
use crate::models::user::UserRole;

/// Error type for authorization checks; every variant maps to 403
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Caller's role is not in the allowed set
    #[error("Not authorized to access this route")]
    RoleDenied {
        required: &'static [UserRole],
        actual: UserRole,
    },

    /// Caller is neither creator nor assignee of the task
    #[error("You do not have permission to view this task")]
    ViewDenied,

    /// Caller is not the creator of the task
    #[error("You can only modify tasks you created")]
    NotCreator,

    /// Caller may not comment on the task
    #[error("You cannot comment on this task")]
    CommentDenied,
}

/// Requires the caller's role to be one of the allowed set
pub fn require_role(actual: UserRole, allowed: &'static [UserRole]) -> Result<(), AccessError> {
    if allowed.contains(&actual) {
        Ok(())
    } else {
        Err(AccessError::RoleDenied {
            required: allowed,
            actual,
        })
    }
}

/// Whether a user may read a task: creator or assignee
pub fn can_view_task(task: &Task, user_id: Uuid) -> bool {
    task.created_by == user_id || task.assigned_to == user_id
}

/// Requires read access to a task
pub fn require_task_view(task: &Task, user_id: Uuid) -> Result<(), AccessError> {
    if can_view_task(task, user_id) {
        Ok(())
    } else {
        Err(AccessError::ViewDenied)
    }
}

/// Requires the caller to be the task's creator (update / delete)
pub fn require_task_creator(task: &Task, user_id: Uuid) -> Result<(), AccessError> {
    if task.created_by == user_id {
        Ok(())
    } else {
        Err(AccessError::NotCreator)
    }
}

/// Requires comment access: creator or assignee
pub fn require_task_participant(task: &Task, user_id: Uuid) -> Result<(), AccessError> {
    if task.created_by == user_id || task.assigned_to == user_id {
        Ok(())
    } else {
        Err(AccessError::CommentDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;
    use sqlx::types::Json;

    fn task_between(created_by: Uuid, assigned_to: Uuid) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Task".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            created_by,
            assigned_to,
            tags: Vec::new(),
            estimated_hours: None,
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
    fn test_require_role() {
        const ALLOWED: &[UserRole] = &[UserRole::Admin, UserRole::Manager];

        assert!(require_role(UserRole::Admin, ALLOWED).is_ok());
        assert!(require_role(UserRole::Manager, ALLOWED).is_ok());
        assert!(matches!(
            require_role(UserRole::User, ALLOWED),
            Err(AccessError::RoleDenied { .. })
        ));
    }

    #[test]
    fn test_view_requires_creator_or_assignee() {
        let creator = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let task = task_between(creator, assignee);

        assert!(require_task_view(&task, creator).is_ok());
        assert!(require_task_view(&task, assignee).is_ok());
        assert!(matches!(
            require_task_view(&task, stranger),
            Err(AccessError::ViewDenied)
        ));
    }

    #[test]
    fn test_modify_requires_creator_only() {
        let creator = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let task = task_between(creator, assignee);

        assert!(require_task_creator(&task, creator).is_ok());
        // The assignee may view but not modify.
        assert!(matches!(
            require_task_creator(&task, assignee),
            Err(AccessError::NotCreator)
        ));
    }

    #[test]
    fn test_comment_requires_participant() {
        let creator = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let task = task_between(creator, assignee);

        assert!(require_task_participant(&task, creator).is_ok());
        assert!(require_task_participant(&task, assignee).is_ok());
        assert!(require_task_participant(&task, Uuid::new_v4()).is_err());
    }

    // Self-assigned task: creator == assignee gets every permission.
    #[test]
    fn test_self_assigned_task() {
        let user = Uuid::new_v4();
        let task = task_between(user, user);

        assert!(require_task_view(&task, user).is_ok());
        assert!(require_task_creator(&task, user).is_ok());
        assert!(require_task_participant(&task, user).is_ok());
    }
}
