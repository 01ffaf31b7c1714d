/// Application state and router builder
///
/// `AppState` carries the process-wide resources: the database pool, the
/// cache client, and configuration. Both the pool and the cache client are
/// constructed once in `main` and injected here; no module-level mutable
/// state anywhere.
///
/// # Router layout
///
/// ```text
/// /
/// ├── /health                        # liveness + dependency status (public)
/// └── /api/v1/
///     ├── /auth/
///     │   ├── POST  /register        # public
///     │   ├── POST  /login           # public
///     │   ├── POST  /logout          # authenticated
///     │   ├── GET   /me              # authenticated
///     │   ├── PATCH /update-profile  # authenticated
///     │   └── PATCH /change-password # authenticated
///     └── /tasks/                    # all authenticated
///         ├── POST   /               # role: admin or manager
///         ├── GET    /               # filter/sort/paginate, cached
///         ├── GET    /my-tasks       # cached
///         ├── GET    /dashboard      # cached
///         ├── GET    /:id            # creator or assignee
///         ├── PATCH  /:id            # creator only
///         ├── DELETE /:id            # creator only, soft delete
///         └── POST   /:id/comments   # creator or assignee
/// ```

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use taskforge_shared::cache::CacheClient;

use crate::{
    config::Config,
    error::ErrorResponse,
    middleware::{auth::require_auth, security::SecurityHeadersLayer},
    routes,
};

/// Shared application state, cloned per request via the `State` extractor
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (system of record)
    pub db: PgPool,

    /// Cache client; may be disconnected, in which case every cache call
    /// degrades to a no-op
    pub cache: CacheClient,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, cache: CacheClient, config: Config) -> Self {
        Self {
            db,
            cache,
            config: Arc::new(config),
        }
    }

    /// JWT signing secret
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Configured token lifetime
    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.config.jwt.expire_hours)
    }
}

/// Builds the complete router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let auth_public = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let auth_protected = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me))
        .route("/update-profile", patch(routes::auth::update_profile))
        .route("/change-password", patch(routes::auth::change_password))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route("/my-tasks", get(routes::tasks::my_tasks))
        .route("/dashboard", get(routes::tasks::dashboard))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/comments", post(routes::tasks::add_comment))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_public.merge(auth_protected))
        .nest("/tasks", task_routes);

    let cors = build_cors(&state.config);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", v1_routes)
        .fallback(route_not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS policy: permissive in development (`*`), explicit origin list with
/// credentials otherwise
fn build_cors(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    }
}

/// Envelope-shaped 404 for unknown routes
async fn route_not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            success: false,
            message: "Route not found".to_string(),
            errors: None,
        }),
    )
}
