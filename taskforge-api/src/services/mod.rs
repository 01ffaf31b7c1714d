/// Service layer: business rules between route handlers and the store
///
/// Services own the read-through caching and write invalidation; handlers
/// own request parsing and response shaping; models own SQL. Every cache
/// interaction here is advisory: an unavailable cache degrades to direct
/// store access.

pub mod tasks;
pub mod users;
