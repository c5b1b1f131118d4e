/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdeck_api::{app::AppState, config::Config};
/// use taskdeck_shared::db::Database;
/// use taskdeck_shared::store::PgStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let store = PgStore::new(Database::new(config.pool_config()));
/// let state = AppState::new(Arc::new(store), config);
/// let app = taskdeck_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, session::session_gate},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use taskdeck_shared::auth::gate::AuthGate;
use taskdeck_shared::store::Store;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Room for multipart framing on top of the avatar size limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Users, tasks, and task groups
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Token verification for protected paths
    pub gate: AuthGate,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let gate = AuthGate::new(config.jwt.secret.clone());
        Self {
            store,
            config: Arc::new(config),
            gate,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Whether cookies carry the `Secure` flag
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// ├── /api/
/// │   ├── POST   /signup               # public
/// │   ├── POST   /login                # public
/// │   ├── GET|POST /logout             # public
/// │   ├── GET    /verifytoken
/// │   ├── GET|PUT /users
/// │   ├── POST   /avatar-upload
/// │   ├── DELETE /avatar
/// │   ├── GET|POST /tasks
/// │   ├── GET|PUT|DELETE /tasks/:id
/// │   ├── GET|POST /taskgroup
/// │   ├── GET|DELETE /taskgroup/:id
/// │   └── PATCH|DELETE /taskgroup-task-link
/// ├── /uploads/*                       # Avatars (public)
/// └── /*                               # Static front-end (pages gated)
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session gate (every path, including static files)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let avatar_limit = state
        .config
        .storage
        .max_avatar_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let api_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route(
            "/logout",
            get(routes::auth::logout).post(routes::auth::logout),
        )
        .route("/verifytoken", get(routes::auth::verify_token))
        .route(
            "/users",
            get(routes::users::get_current_user).put(routes::users::update_profile),
        )
        .route(
            "/avatar-upload",
            post(routes::users::upload_avatar).layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route("/avatar", delete(routes::users::delete_avatar))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/taskgroup",
            get(routes::task_groups::list_groups).post(routes::task_groups::create_group),
        )
        .route(
            "/taskgroup/:id",
            get(routes::task_groups::get_group).delete(routes::task_groups::delete_group),
        )
        .route(
            "/taskgroup-task-link",
            axum::routing::patch(routes::task_groups::link_task)
                .delete(routes::task_groups::unlink_task),
        );

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
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
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let uploads_dir = state.config.storage.uploads_dir.clone();
    let static_dir = state.config.storage.static_dir.clone();

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .fallback_service(ServeDir::new(static_dir))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_gate,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
