use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::permissions::{USER_MANAGE, USER_VIEW};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{division, position, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{escape_like, page_params, parse_sort_order};
use crate::models::user::*;
use crate::services::group::GroupService;
use crate::services::membership::MembershipSync;
use crate::state::AppState;

async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List employees with pagination and search",
    description = "Soft-deleted users are hidden unless `include_deleted` is set. Search matches username, first or last name, e-mail and employee ID. Sorting by `created_at`, `username`, `employee_id` or `hire_date`.",
    params(UserListQuery),
    responses(
        (status = 200, description = "List of users", body = UserListResponse),
        (status = 400, description = "Invalid sort parameters (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_permission(USER_VIEW)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "created_at" => user::Column::CreatedAt,
        "username" => user::Column::Username,
        "employee_id" => user::Column::EmployeeId,
        "hire_date" => user::Column::HireDate,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: created_at, username, employee_id, hire_date".into(),
            ));
        }
    };
    let sort_order = parse_sort_order(query.sort_order.as_deref())?;

    let mut select = user::Entity::find();

    if !query.include_deleted.unwrap_or(false) {
        select = select.filter(user::Column::DeletedAt.is_null());
    }
    if let Some(division_id) = query.division_id {
        select = select.filter(user::Column::DivisionId.eq(division_id));
    }
    if let Some(position_id) = query.position_id {
        select = select.filter(user::Column::PositionId.eq(position_id));
    }
    if let Some(status) = query.status {
        select = select.filter(user::Column::Status.eq(status));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(user::Column::IsActive.eq(is_active));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            let mut any = Condition::any();
            for col in [
                user::Column::Username,
                user::Column::FirstName,
                user::Column::LastName,
                user::Column::Email,
                user::Column::EmployeeId,
            ] {
                any = any.add(
                    Expr::expr(Func::lower(Expr::col(col)))
                        .like(LikeExpr::new(pattern.clone()).escape('\\')),
                );
            }
            select = select.filter(any);
        }
    }

    let total = select.clone().count(&state.db).await?;

    let data = select
        .order_by(sort_column, sort_order)
        .order_by_asc(user::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(UserListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get an employee by ID",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserDetailResponse>, AppError> {
    auth_user.require_self_or(id, USER_VIEW)?;
    let user = find_user(&state.db, id).await?;
    let groups = GroupService::new(&state.db)
        .group_names_for_user(id)
        .await?;
    Ok(Json(UserDetailResponse {
        user: user.into(),
        groups,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Users",
    operation_id = "updateUser",
    summary = "Update an employee",
    description = "Partially updates an employee record. Assigning another position moves the user from the old position's access group into the new one. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User, division or position not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "E-mail already in use (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission(USER_MANAGE)?;
    validate_update_user(&payload)?;

    let txn = state.db.begin().await?;
    let existing = find_user(&txn, id).await?;
    let previous_position = existing.position_id;
    let mut active: user::ActiveModel = existing.into();

    if let Some(email) = payload.email {
        active.email = Set(email.trim().to_lowercase());
    }
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone);
    }
    if let Some(division_id) = payload.division_id {
        if let Some(division_id) = division_id {
            division::Entity::find_by_id(division_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("Division not found".into()))?;
        }
        active.division_id = Set(division_id);
    }
    if let Some(position_id) = payload.position_id {
        if let Some(position_id) = position_id {
            position::Entity::find_by_id(position_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("Position not found".into()))?;
        }
        active.position_id = Set(position_id);
    }
    if let Some(hire_date) = payload.hire_date {
        active.hire_date = Set(hire_date);
    }
    if let Some(employment_type) = payload.employment_type {
        active.employment_type = Set(employment_type);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("E-mail is already in use".into())
        }
        _ => AppError::from(e),
    })?;

    if model.position_id != previous_position {
        MembershipSync::new(&txn)
            .sync_user(model.id, model.position_id)
            .await?;
        tracing::info!(
            user_id = model.id,
            from = ?previous_position,
            to = ?model.position_id,
            "Moved user to another position"
        );
    }

    txn.commit().await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Users",
    operation_id = "deleteUser",
    summary = "Soft-delete an employee",
    description = "Deactivates the account and records who deleted it and when. The record and its memberships are kept so it can be restored. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Cannot delete own account (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(USER_MANAGE)?;
    if auth_user.user_id == id {
        return Err(AppError::Conflict("Cannot delete your own account".into()));
    }

    let existing = find_user(&state.db, id).await?;
    if existing.deleted_at.is_some() {
        return Ok(StatusCode::NO_CONTENT);
    }

    let now = chrono::Utc::now();
    let mut active: user::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.deleted_at = Set(Some(now));
    active.deleted_by = Set(Some(auth_user.user_id));
    active.updated_at = Set(now);
    active.update(&state.db).await?;

    tracing::info!(user_id = id, deleted_by = auth_user.user_id, "Soft-deleted user");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/restore",
    tag = "Users",
    operation_id = "restoreUser",
    summary = "Restore a soft-deleted employee",
    description = "Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User restored", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn restore_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission(USER_MANAGE)?;

    let mut active: user::ActiveModel = find_user(&state.db, id).await?.into();
    active.is_active = Set(true);
    active.deleted_at = Set(None);
    active.deleted_by = Set(None);
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&state.db).await?;

    Ok(Json(model.into()))
}
