/// Database models
///
/// - `user`: accounts, roles, profile/preference documents
/// - `task`: tasks with embedded comments/attachments and the filtered,
///   sorted, paginated query engine
/// - `dashboard`: per-user aggregate statistics

pub mod dashboard;
pub mod task;
pub mod user;
