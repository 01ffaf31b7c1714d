/// Middleware for the API server
///
/// - `auth`: token resolution and the required/optional authentication
///   layers
/// - `security`: security-related response headers

pub mod auth;
pub mod security;
