use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use common::{EmploymentStatus, permissions};
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, RegisterRequest,
    RegisterResponse, validate_login_request, validate_password, validate_register_request,
};
use crate::services::group::GroupService;
use crate::state::AppState;
use crate::utils::{hash, jwt};

/// Permissions a user's token should carry.
pub async fn effective_permissions<C: ConnectionTrait>(
    db: &C,
    user: &user::Model,
) -> Result<Vec<String>, AppError> {
    if user.is_superuser {
        return Ok(permissions::all_codenames());
    }
    Ok(GroupService::new(db).permissions_for_user(user.id).await?)
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register an employee account",
    description = "Creates a new employee account. The account holds no position and no groups until assigned.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Username taken (USERNAME_TAKEN) or employee ID / e-mail in use (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let now = chrono::Utc::now();
    let new_user = user::ActiveModel {
        username: Set(payload.username.trim().to_string()),
        password: Set(hash),
        employee_id: Set(payload.employee_id.trim().to_string()),
        email: Set(payload.email.trim().to_lowercase()),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        phone: Set(payload.phone.unwrap_or_default()),
        status: Set(EmploymentStatus::Active),
        is_active: Set(true),
        is_superuser: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("username") => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::UsernameTaken
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Employee ID or e-mail is already registered".into())
        }
        _ => AppError::from(e),
    })?;

    tracing::info!(user_id = user.id, "Registered user");
    Ok((StatusCode::CREATED, Json(RegisterResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in and obtain a JWT",
    description = "Authenticates with username and password. The token carries the union of the permissions granted by the user's groups; superusers receive every permission.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let user = user::Entity::find()
        .filter(user::Column::Username.eq(payload.username.trim()))
        .filter(user::Column::DeletedAt.is_null())
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid || !user.is_active {
        return Err(AppError::InvalidCredentials);
    }

    let permissions = effective_permissions(&state.db, &user).await?;

    let token = jwt::sign(
        user.id,
        &user.username,
        permissions.clone(),
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_days,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        username: user.username,
        permissions,
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    summary = "Get the current user's profile",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Account no longer exists (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, AppError> {
    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let groups = GroupService::new(&state.db)
        .group_names_for_user(user.id)
        .await?;

    Ok(Json(MeResponse {
        full_name: user.full_name(),
        id: user.id,
        username: user.username,
        email: user.email,
        employee_id: user.employee_id,
        division_id: user.division_id,
        position_id: user.position_id,
        is_superuser: user.is_superuser,
        groups,
        permissions: auth_user.permissions,
    }))
}

#[utoipa::path(
    post,
    path = "/change-password",
    tag = "Auth",
    operation_id = "changePassword",
    summary = "Change the current user's password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong current password (INVALID_CREDENTIALS) or unauthorized", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn change_password(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    validate_password(&payload.new_password)?;

    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let is_valid = hash::verify_password(&payload.current_password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let hash = hash::hash_password(&payload.new_password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let mut active: user::ActiveModel = user.into();
    active.password = Set(hash);
    active.updated_at = Set(chrono::Utc::now());
    active.update(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}
