use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::hierarchy::normalize_code;
use common::permissions::{DIVISION_CREATE, DIVISION_DELETE, DIVISION_EDIT, DIVISION_VIEW};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{division, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::division::*;
use crate::models::shared::{escape_like, page_params, parse_sort_order};
use crate::models::user::UserResponse;
use crate::services::division::{
    ensure_code_free, find_division, full_path, level_under, remove, reparent, statistics,
};
use crate::state::AppState;

async fn division_response<C: ConnectionTrait>(
    db: &C,
    model: division::Model,
) -> Result<DivisionResponse, AppError> {
    let path = full_path(db, &model).await?;
    let employee_count = user::Entity::find()
        .filter(user::Column::DivisionId.eq(model.id))
        .count(db)
        .await?;
    Ok(DivisionResponse::new(model, path, employee_count))
}

fn duplicate_code_or(err: DbErr, code: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::DuplicateCode(format!("Division with code '{code}' already exists"))
        }
        _ => AppError::from(err),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Divisions",
    operation_id = "listDivisions",
    summary = "List divisions with pagination and search",
    description = "Supports filtering by parent and active flag, a case-insensitive search on name, code or description, and sorting by `name`, `code` or `created_at`.",
    params(DivisionListQuery),
    responses(
        (status = 200, description = "List of divisions", body = DivisionListResponse),
        (status = 400, description = "Invalid sort parameters (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_divisions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DivisionListQuery>,
) -> Result<Json<DivisionListResponse>, AppError> {
    auth_user.require_permission(DIVISION_VIEW)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let sort_column = match query.sort_by.as_deref().unwrap_or("name") {
        "name" => division::Column::Name,
        "code" => division::Column::Code,
        "created_at" => division::Column::CreatedAt,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: name, code, created_at".into(),
            ));
        }
    };
    let sort_order = match query.sort_order.as_deref() {
        None if query.sort_by.is_none() => Order::Asc,
        other => parse_sort_order(other)?,
    };

    let mut select = division::Entity::find();

    if let Some(parent_id) = query.parent_id {
        select = select.filter(division::Column::ParentId.eq(parent_id));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(division::Column::IsActive.eq(is_active));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            let mut any = Condition::any();
            for col in [
                division::Column::Name,
                division::Column::Code,
                division::Column::Description,
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
        .order_by_asc(division::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(DivisionListItem::from)
        .collect();

    Ok(Json(DivisionListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Divisions",
    operation_id = "createDivision",
    summary = "Create a division",
    description = "Creates a division, optionally under a parent. Requires `division:create` permission.",
    request_body = CreateDivisionRequest,
    responses(
        (status = 201, description = "Division created", body = DivisionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Parent division not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Code in use (DUPLICATE_CODE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(code = %payload.code))]
pub async fn create_division(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateDivisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(DIVISION_CREATE)?;
    validate_create_division(&payload)?;

    let code = normalize_code(&payload.code);

    let txn = state.db.begin().await?;
    ensure_code_free(&txn, &code, None).await?;
    let level = level_under(&txn, payload.parent_id).await?;

    let now = chrono::Utc::now();
    let model = division::ActiveModel {
        code: Set(code.clone()),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        parent_id: Set(payload.parent_id),
        level: Set(level),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| duplicate_code_or(e, &code))?;

    let response = division_response(&txn, model).await?;
    txn.commit().await?;

    tracing::info!(division_id = response.id, "Created division");
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Divisions",
    operation_id = "getDivision",
    summary = "Get a division by ID",
    description = "Includes the full ancestor path and the number of employees assigned to the division.",
    params(("id" = i32, Path, description = "Division ID")),
    responses(
        (status = 200, description = "Division details", body = DivisionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Division not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_division(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DivisionResponse>, AppError> {
    auth_user.require_permission(DIVISION_VIEW)?;
    let model = find_division(&state.db, id).await?;
    Ok(Json(division_response(&state.db, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Divisions",
    operation_id = "updateDivision",
    summary = "Update a division",
    description = "Partially updates a division. Moving it re-levels the whole subtree; a division cannot be moved under itself or its own sub-divisions. Requires `division:edit` permission.",
    params(("id" = i32, Path, description = "Division ID")),
    request_body = UpdateDivisionRequest,
    responses(
        (status = 200, description = "Division updated", body = DivisionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR) or cycle (INVALID_HIERARCHY)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Division or parent not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Code in use (DUPLICATE_CODE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_division(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateDivisionRequest>,
) -> Result<Json<DivisionResponse>, AppError> {
    auth_user.require_permission(DIVISION_EDIT)?;
    validate_update_division(&payload)?;

    let txn = state.db.begin().await?;
    let existing = find_division(&txn, id).await?;
    let mut active: division::ActiveModel = existing.clone().into();
    let mut code = existing.code.clone();

    if let Some(ref new_code) = payload.code {
        let new_code = normalize_code(new_code);
        if new_code != existing.code {
            ensure_code_free(&txn, &new_code, Some(id)).await?;
            active.code = Set(new_code.clone());
            code = new_code;
        }
    }
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(parent_id) = payload.parent_id
        && parent_id != existing.parent_id
    {
        let level = reparent(&txn, id, parent_id).await?;
        active.parent_id = Set(parent_id);
        active.level = Set(level);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active
        .update(&txn)
        .await
        .map_err(|e| duplicate_code_or(e, &code))?;
    let response = division_response(&txn, model).await?;
    txn.commit().await?;

    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Divisions",
    operation_id = "deleteDivision",
    summary = "Delete a division",
    description = "Deletes a division that nothing references. A division that still has employees or sub-divisions is only deactivated. Requires `division:delete` permission.",
    params(("id" = i32, Path, description = "Division ID")),
    responses(
        (status = 200, description = "Division deleted or deactivated", body = DeleteDivisionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Division not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_division(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteDivisionResponse>, AppError> {
    auth_user.require_permission(DIVISION_DELETE)?;

    let txn = state.db.begin().await?;
    let outcome = remove(&txn, id).await?;
    txn.commit().await?;

    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/{id}/statistics",
    tag = "Divisions",
    operation_id = "getDivisionStatistics",
    summary = "Head-count statistics of a division",
    params(("id" = i32, Path, description = "Division ID")),
    responses(
        (status = 200, description = "Division statistics", body = DivisionStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Division not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn division_statistics(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DivisionStatsResponse>, AppError> {
    auth_user.require_permission(DIVISION_VIEW)?;
    find_division(&state.db, id).await?;
    let stats = statistics(&state.db, id).await?;
    Ok(Json(DivisionStatsResponse::new(id, stats)))
}

#[utoipa::path(
    get,
    path = "/{id}/employees",
    tag = "Divisions",
    operation_id = "listDivisionEmployees",
    summary = "List the employees of a division",
    description = "Returns the non-deleted employees assigned to the division, ordered by employee ID.",
    params(("id" = i32, Path, description = "Division ID")),
    responses(
        (status = 200, description = "Employees", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Division not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn division_employees(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth_user.require_permission(DIVISION_VIEW)?;
    find_division(&state.db, id).await?;

    let employees = user::Entity::find()
        .filter(user::Column::DivisionId.eq(id))
        .filter(user::Column::DeletedAt.is_null())
        .order_by_asc(user::Column::EmployeeId)
        .all(&state.db)
        .await?;

    Ok(Json(employees.into_iter().map(UserResponse::from).collect()))
}
