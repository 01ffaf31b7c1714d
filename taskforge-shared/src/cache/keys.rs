/// Cache key construction
///
/// Keys are namespaced by purpose so that invalidation can target a whole
/// namespace with a glob pattern:
///
/// ```text
/// user:<id>                    single user, exact-key invalidation
/// task:<id>                    single task, exact-key invalidation
/// tasks:<user_id>:<query>      list results, glob invalidation per user
/// mytasks:<user_id>:<query>    assignee-scoped lists, glob per user
/// dashboard:<user_id>          aggregate stats, exact-key invalidation
/// blacklist:<token>            revoked tokens, self-expiring
/// ```
///
/// List keys embed the serialized query parameters, which cannot be
/// enumerated at invalidation time; the caller id sits in a fixed position
/// so `tasks:<uid>:*` clears every variant for that user.

use uuid::Uuid;

/// Key for a cached user profile.
pub fn user(id: Uuid) -> String {
    format!("user:{}", id)
}

/// Key for a cached single task.
pub fn task(id: Uuid) -> String {
    format!("task:{}", id)
}

/// Key for a cached task-list page. `query` is the serialized query
/// parameters (filters, sort, pagination).
pub fn task_list(user_id: Uuid, query: &str) -> String {
    format!("tasks:{}:{}", user_id, query)
}

/// Key for a cached assignee-scoped list page.
pub fn my_tasks(user_id: Uuid, query: &str) -> String {
    format!("mytasks:{}:{}", user_id, query)
}

/// Key for a user's cached dashboard statistics.
pub fn dashboard(user_id: Uuid) -> String {
    format!("dashboard:{}", user_id)
}

/// Key marking a revoked token. The entry's TTL equals the token's
/// remaining lifetime, so it expires exactly when the token would.
pub fn blacklist(token: &str) -> String {
    format!("blacklist:{}", token)
}

/// Glob pattern matching every cached list page for a user.
pub fn task_list_pattern(user_id: Uuid) -> String {
    format!("tasks:{}:*", user_id)
}

/// Glob pattern matching every assignee-scoped list page for a user.
pub fn my_tasks_pattern(user_id: Uuid) -> String {
    format!("mytasks:{}:*", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_namespaces() {
        let id = Uuid::new_v4();

        assert_eq!(user(id), format!("user:{}", id));
        assert_eq!(task(id), format!("task:{}", id));
        assert_eq!(dashboard(id), format!("dashboard:{}", id));
        assert_eq!(blacklist("abc.def.ghi"), "blacklist:abc.def.ghi");
    }

    #[test]
    fn test_list_keys_embed_user_and_query() {
        let id = Uuid::new_v4();
        let query = r#"{"status":"todo","page":1}"#;

        let key = task_list(id, query);
        assert!(key.starts_with(&format!("tasks:{}:", id)));
        assert!(key.ends_with(query));

        let key = my_tasks(id, query);
        assert!(key.starts_with(&format!("mytasks:{}:", id)));
    }

    #[test]
    fn test_patterns_cover_list_keys() {
        let id = Uuid::new_v4();
        let key = task_list(id, "{}");
        let pattern = task_list_pattern(id);

        // The pattern's fixed prefix must match the key's prefix.
        let prefix = pattern.trim_end_matches('*');
        assert!(key.starts_with(prefix));

        let key = my_tasks(id, "{}");
        let prefix_string = my_tasks_pattern(id);
        let prefix = prefix_string.trim_end_matches('*');
        assert!(key.starts_with(prefix));
    }
}
