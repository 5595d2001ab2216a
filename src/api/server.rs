//! HTTP API server

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{require_auth, role_guard, CredentialStore, TokenService, UserRole};
use crate::config::Config;
use crate::error::{Error, Result, INTERNAL_ERROR_MESSAGE};
use crate::store::{self, SharedStore};

use super::{courses, routes};

const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];
const STAFF: &[UserRole] = &[UserRole::Admin, UserRole::Teacher];
const EVERYONE: &[UserRole] = &[UserRole::Admin, UserRole::Teacher, UserRole::Student];
const TEACHER_ONLY: &[UserRole] = &[UserRole::Teacher];
const STUDENT_ONLY: &[UserRole] = &[UserRole::Student];

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub tokens: TokenService,
    pub credentials: CredentialStore,
    pub store: SharedStore,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the services around an already opened store
    pub fn new(config: Config, store: SharedStore) -> SharedState {
        let tokens = TokenService::from_config(&config.auth);
        let credentials = CredentialStore::new(store.clone(), config.auth.bcrypt_cost);
        Arc::new(Self {
            config,
            tokens,
            credentials,
            store,
        })
    }
}

/// Run the HTTP API server
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    config.validate()?;
    if config.uses_default_secret() {
        tracing::warn!("auth.jwt_secret is the built-in default; set it before deploying");
    }

    let store = store::connect(&config.database).await?;
    let state = AppState::new(config, store);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    serve(listener, state).await
}

/// Serve on an already bound listener
pub async fn serve(listener: tokio::net::TcpListener, state: SharedState) -> Result<()> {
    let app = create_router(state)?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| Error::Config(format!("Invalid CORS origin '{}': {}", origin, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

/// Turn a handler panic into the generic 500 body
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": INTERNAL_ERROR_MESSAGE })),
    )
        .into_response()
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Result<Router> {
    let cors = cors_layer(&state.config.server.cors_origins)?;

    let admin = Router::new()
        .route("/admin", get(routes::list_users))
        .route(
            "/admin/{id}",
            get(routes::get_user)
                .put(routes::update_user)
                .delete(routes::delete_user),
        )
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            role_guard(ADMIN_ONLY, req, next)
        }));

    let staff = Router::new()
        .route("/teacher", get(routes::teacher_access))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            role_guard(STAFF, req, next)
        }));

    let everyone = Router::new()
        .route("/student", get(routes::student_access))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            role_guard(EVERYONE, req, next)
        }));

    let teacher = Router::new()
        .route(
            "/teacher/courses",
            get(courses::list_teacher_courses).post(courses::create_course),
        )
        .route(
            "/teacher/courses/{id}",
            get(courses::get_teacher_course).put(courses::update_course),
        )
        .route("/teacher/courses/{id}/students", post(courses::add_students))
        .route(
            "/teacher/courses/{id}/students/{student_id}",
            delete(courses::remove_student),
        )
        .route(
            "/teacher/courses/{id}/zoom-links",
            post(courses::add_meeting_link),
        )
        .route(
            "/teacher/courses/{id}/zoom-links/{link_id}",
            delete(courses::remove_meeting_link),
        )
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            role_guard(TEACHER_ONLY, req, next)
        }));

    let student = Router::new()
        .route("/student/courses", get(courses::list_student_courses))
        .route("/student/courses/{course_id}", get(courses::get_student_course))
        .route(
            "/student/available-courses",
            get(courses::list_available_courses),
        )
        .route("/student/courses/{course_id}/enroll", post(courses::enroll))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            role_guard(STUDENT_ONLY, req, next)
        }));

    // Authentication runs before every role guard
    let protected = Router::new()
        .merge(admin)
        .merge(staff)
        .merge(everyone)
        .merge(teacher)
        .merge(student)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let auth = Router::new()
        .route("/register", post(routes::register))
        .route("/login", post(routes::login))
        .merge(protected);

    Ok(Router::new()
        .route("/", get(routes::index))
        .route("/api/health", get(routes::health))
        .nest("/api/auth", auth)
        // Middleware
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}
