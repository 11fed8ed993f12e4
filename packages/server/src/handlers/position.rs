use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::permissions::{POSITION_CREATE, POSITION_DELETE, POSITION_EDIT, POSITION_VIEW};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::position;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::position::*;
use crate::models::shared::{escape_like, page_params};
use crate::services::position::{NewPosition, PositionService};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Positions",
    operation_id = "listPositions",
    summary = "List positions",
    description = "Returns positions ordered by level, then code. Supports filtering by level, active flag and parent, and a case-insensitive search on name or code.",
    params(PositionListQuery),
    responses(
        (status = 200, description = "List of positions", body = PositionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_positions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PositionListQuery>,
) -> Result<Json<PositionListResponse>, AppError> {
    auth_user.require_permission(POSITION_VIEW)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = position::Entity::find();

    if let Some(level) = query.level {
        select = select.filter(position::Column::Level.eq(level));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(position::Column::IsActive.eq(is_active));
    }
    if let Some(parent_id) = query.parent_id {
        select = select.filter(position::Column::ParentId.eq(parent_id));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(position::Column::Name)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(position::Column::Code)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    let total = select.clone().count(&state.db).await?;

    let data = select
        .order_by_asc(position::Column::Level)
        .order_by_asc(position::Column::Code)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(PositionResponse::from)
        .collect();

    Ok(Json(PositionListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/tree",
    tag = "Positions",
    operation_id = "getPositionTree",
    summary = "Get the position hierarchy",
    description = "Returns every position nested under its parent. Positions without a parent are roots.",
    responses(
        (status = 200, description = "Position tree", body = Vec<PositionTreeNode>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn position_tree(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PositionTreeNode>>, AppError> {
    auth_user.require_permission(POSITION_VIEW)?;
    let tree = PositionService::new(&state.db).tree().await?;
    Ok(Json(tree))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Positions",
    operation_id = "createPosition",
    summary = "Create a position",
    description = "Creates a position under an optional parent with a lower level. Links the given access group, or creates a group named `Position: {name}` when none is given. Requires `position:create` permission.",
    request_body = CreatePositionRequest,
    responses(
        (status = 201, description = "Position created", body = PositionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR) or parent does not outrank (INVALID_HIERARCHY)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Parent position or group not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Code in use (DUPLICATE_CODE) or group already linked (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(code = %payload.code, level = payload.level))]
pub async fn create_position(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePositionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(POSITION_CREATE)?;
    validate_create_position(&payload)?;

    let txn = state.db.begin().await?;
    let model = PositionService::new(&txn)
        .create(NewPosition {
            name: payload.name,
            code: payload.code,
            level: payload.level,
            parent_id: payload.parent_id,
            group_id: payload.group_id,
        })
        .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(PositionResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Positions",
    operation_id = "getPosition",
    summary = "Get a position by ID",
    params(("id" = i32, Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position details", body = PositionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Position not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_position(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PositionResponse>, AppError> {
    auth_user.require_permission(POSITION_VIEW)?;
    let model = PositionService::new(&state.db).find(id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Positions",
    operation_id = "updatePosition",
    summary = "Update a position",
    description = "Partially updates a position. The parent must keep a lower level and every subordinate a higher one. Renaming also relabels the linked access group. Requires `position:edit` permission.",
    params(("id" = i32, Path, description = "Position ID")),
    request_body = UpdatePositionRequest,
    responses(
        (status = 200, description = "Position updated", body = PositionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR) or ordering violated (INVALID_HIERARCHY)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Position or parent not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Code in use (DUPLICATE_CODE) or group label taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_position(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdatePositionRequest>,
) -> Result<Json<PositionResponse>, AppError> {
    auth_user.require_permission(POSITION_EDIT)?;
    validate_update_position(&payload)?;

    let txn = state.db.begin().await?;
    let model = PositionService::new(&txn).update(id, payload.into()).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    put,
    path = "/{id}/group",
    tag = "Positions",
    operation_id = "linkPositionGroup",
    summary = "Change the access group linked to a position",
    description = "Links another access group (or none) and moves every holder of the position into it. Linking the current group is a no-op. Requires `position:edit` permission.",
    params(("id" = i32, Path, description = "Position ID")),
    request_body = LinkGroupRequest,
    responses(
        (status = 200, description = "Group linked", body = PositionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Position or group not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Group already linked to another position (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, group_id = ?payload.group_id))]
pub async fn link_group(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<LinkGroupRequest>,
) -> Result<Json<PositionResponse>, AppError> {
    auth_user.require_permission(POSITION_EDIT)?;

    let txn = state.db.begin().await?;
    let model = PositionService::new(&txn)
        .link_group(id, payload.group_id)
        .await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/sync-members",
    tag = "Positions",
    operation_id = "syncPositionMembers",
    summary = "Resynchronise the holders' group memberships",
    description = "Makes every holder of the position a member of its linked group, replacing any other position-derived membership. Manually managed groups are left alone. Requires `position:edit` permission.",
    params(("id" = i32, Path, description = "Position ID")),
    responses(
        (status = 200, description = "Members synced", body = SyncMembersResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Position not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn sync_members(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SyncMembersResponse>, AppError> {
    auth_user.require_permission(POSITION_EDIT)?;

    let txn = state.db.begin().await?;
    let service = PositionService::new(&txn);
    let model = service.find(id).await?;
    let synced = service.sync_members(id).await?;
    txn.commit().await?;

    Ok(Json(SyncMembersResponse {
        position_id: model.id,
        group_id: model.group_id,
        synced,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/deactivate",
    tag = "Positions",
    operation_id = "deactivatePosition",
    summary = "Deactivate a position",
    description = "Marks the position inactive. Subordinates, holders and the linked group are kept. Requires `position:delete` permission.",
    params(("id" = i32, Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position deactivated", body = PositionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Position not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn deactivate_position(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PositionResponse>, AppError> {
    auth_user.require_permission(POSITION_DELETE)?;

    let txn = state.db.begin().await?;
    let model = PositionService::new(&txn).soft_deactivate(id).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/{id}/activate",
    tag = "Positions",
    operation_id = "activatePosition",
    summary = "Reactivate a position",
    description = "Requires `position:edit` permission.",
    params(("id" = i32, Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position activated", body = PositionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Position not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn activate_position(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PositionResponse>, AppError> {
    auth_user.require_permission(POSITION_EDIT)?;

    let txn = state.db.begin().await?;
    let model = PositionService::new(&txn).activate(id).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Positions",
    operation_id = "deletePosition",
    summary = "Permanently delete a position",
    description = "Deletes a position that has no subordinates and no holders, together with its linked access group. Requires `position:delete` permission.",
    params(("id" = i32, Path, description = "Position ID")),
    responses(
        (status = 204, description = "Position deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Position not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Position has subordinates (HAS_SUBORDINATES) or holders (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_position(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(POSITION_DELETE)?;

    let txn = state.db.begin().await?;
    PositionService::new(&txn).hard_delete(id).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
