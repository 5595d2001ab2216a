//! API route handlers for accounts and access checks

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::server::SharedState;
use crate::auth::models::{
    AuthResponse, LoginRequest, RegisterRequest, UpdateUserRequest, User, UserUpdate,
};
use crate::auth::AuthUser;
use crate::error::{Error, Result};

/// Body for operations that only report success
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Parse an id taken from the request path
pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::Validation("Invalid id".to_string()))
}

fn user_not_found() -> Error {
    Error::NotFound("User not found".to_string())
}

// Health check

pub async fn index() -> &'static str {
    "coursedesk API"
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// Registration and login

pub async fn register(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    let user = state
        .credentials
        .register(&req.username, &req.email, &req.password, &req.role)
        .await?;
    let token = state.tokens.issue(user.id)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

pub async fn login(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let Json(req) = payload?;
    let user = state.credentials.authenticate(&req.email, &req.password).await?;
    let token = state.tokens.issue(user.id)?;

    tracing::info!("User {} logged in", user.id);
    Ok(Json(AuthResponse { user, token }))
}

// Admin user management

pub async fn list_users(State(state): State<SharedState>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let record = state
        .store
        .get_user(parse_id(&id)?)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(record.user))
}

pub async fn update_user(
    State(state): State<SharedState>,
    AuthUser(admin): AuthUser,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;
    let update = UserUpdate::try_from(req)?;

    let user = if update.is_empty() {
        state.store.get_user(id).await?.map(|r| r.user)
    } else {
        state.store.update_user(id, &update).await?
    }
    .ok_or_else(user_not_found)?;

    tracing::info!("Admin {} updated user {}", admin.id, user.id);
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<SharedState>,
    AuthUser(admin): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id)?;
    if !state.store.delete_user(id).await? {
        return Err(user_not_found());
    }

    tracing::info!("Admin {} deleted user {}", admin.id, id);
    Ok(MessageResponse::new("User deleted successfully"))
}

// Access probes

pub async fn teacher_access() -> impl IntoResponse {
    MessageResponse::new("Teacher access granted")
}

pub async fn student_access() -> impl IntoResponse {
    MessageResponse::new("Student access granted")
}
