/// API route handlers, organized by resource
///
/// - `health`: liveness and dependency status
/// - `auth`: registration, login/logout, profile, password
/// - `tasks`: task CRUD, lists, comments, dashboard

pub mod auth;
pub mod health;
pub mod tasks;
