//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout and the current user.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use utoipa::ToSchema;
use veridant_core::domain::{Actor, Role, User};
use veridant_core::ports::{DatabaseService, PortError};
use veridant_core::validation::Validator;

use crate::error::{AppError, AppResult, ErrorBody};
use crate::web::middleware::{session_id, SESSION_COOKIE};
use crate::web::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    /// Also usable as `Authorization: Bearer <session_token>`.
    pub session_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            role: u.role.to_string(),
            created_at: u.created_at,
        }
    }
}

//=========================================================================================
// Password and Session Helpers
//=========================================================================================

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            AppError::Internal("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        AppError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Creates the account unless one with this email already exists.
pub async fn ensure_admin(db: &dyn DatabaseService, email: &str, password: &str) -> AppResult<()> {
    let hashed = hash_password(password)?;
    match db.create_user(email, "Administrator", &hashed, Role::Admin).await {
        Ok(user) => {
            info!(email = %user.email, "Bootstrap admin account created");
            Ok(())
        }
        Err(PortError::Conflict(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn start_session(state: &AppState, user_id: Uuid) -> AppResult<(String, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);

    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            AppError::Internal("Failed to create session".to_string())
        })?;

    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        auth_session_id,
        ttl.num_seconds()
    );
    Ok((auth_session_id, cookie))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/signup - Create a new candidate account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    Validator::new()
        .email("email", &req.email)
        .required("full_name", &req.full_name)
        .check(
            "password",
            req.password.chars().count() >= MIN_PASSWORD_LEN,
            "must be at least 8 characters",
        )
        .finish()?;

    let password_hash = hash_password(&req.password)?;
    let user = state
        .db
        .create_user(&req.email, req.full_name.trim(), &password_hash, Role::Candidate)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => AppError::Conflict("Email is already registered".to_string()),
            other => other.into(),
        })?;

    let (session_token, cookie) = start_session(&state, user.id).await?;
    info!(user_id = %user.id, "User signed up");

    let response = AuthResponse {
        user_id: user.id,
        email: user.email,
        full_name: user.full_name,
        role: user.role.to_string(),
        session_token,
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user_creds = state
        .db
        .get_user_credentials(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &user_creds.hashed_password)? {
        return Err(AppError::Unauthorized);
    }

    let user = state
        .db
        .get_user_by_id(user_creds.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let (session_token, cookie) = start_session(&state, user.id).await?;

    let response = AuthResponse {
        user_id: user.id,
        email: user.email,
        full_name: user.full_name,
        role: user.role.to_string(),
        session_token,
    };
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /api/auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = ErrorBody)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let auth_session_id = session_id(&headers).ok_or(AppError::Unauthorized)?;

    state.db.delete_auth_session(auth_session_id).await.map_err(|e| {
        error!("Failed to delete auth session: {:?}", e);
        AppError::Internal("Failed to logout".to_string())
    })?;

    let cookie = format!("{SESSION_COOKIE}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0");
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /api/auth/me - The signed-in user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .db
        .get_user_by_id(actor.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user.into()))
}
