use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::permissions::{self, GROUP_MANAGE, GROUP_VIEW};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{access_group, position, user_group};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::group::*;
use crate::services::group::GroupService;
use crate::state::AppState;

async fn group_response<C: ConnectionTrait>(
    db: &C,
    group: access_group::Model,
) -> Result<GroupResponse, AppError> {
    let position_id: Option<i32> = position::Entity::find()
        .filter(position::Column::GroupId.eq(group.id))
        .select_only()
        .column(position::Column::Id)
        .into_tuple()
        .one(db)
        .await?;
    let perms = GroupService::new(db).permissions(group.id).await?;
    let member_count = user_group::Entity::find()
        .filter(user_group::Column::GroupId.eq(group.id))
        .count(db)
        .await?;
    Ok(GroupResponse::new(group, position_id, perms, member_count))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Groups",
    operation_id = "listGroups",
    summary = "List access groups",
    description = "Returns every access group ordered by name, with its permissions, linked position and member count.",
    responses(
        (status = 200, description = "Access groups", body = Vec<GroupResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_groups(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<GroupResponse>>, AppError> {
    auth_user.require_permission(GROUP_VIEW)?;

    let groups = access_group::Entity::find()
        .order_by_asc(access_group::Column::Name)
        .all(&state.db)
        .await?;

    let mut data = Vec::with_capacity(groups.len());
    for group in groups {
        data.push(group_response(&state.db, group).await?);
    }
    Ok(Json(data))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Groups",
    operation_id = "createGroup",
    summary = "Create an access group",
    description = "Creates a manually managed group. Its memberships are never touched by position synchronisation. Requires `group:manage` permission.",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = GroupResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Name in use (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_group(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(GROUP_MANAGE)?;
    validate_group_name(&payload.name)?;
    validate_permissions(&payload.permissions)?;

    let txn = state.db.begin().await?;
    let groups = GroupService::new(&txn);
    let group = groups.create(payload.name.trim()).await?;
    groups.set_permissions(group.id, &payload.permissions).await?;
    let response = group_response(&txn, group).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Groups",
    operation_id = "getGroup",
    summary = "Get an access group by ID",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group details", body = GroupResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Group not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_group(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<GroupResponse>, AppError> {
    auth_user.require_permission(GROUP_VIEW)?;
    let group = GroupService::new(&state.db).find(id).await?;
    Ok(Json(group_response(&state.db, group).await?))
}

#[utoipa::path(
    put,
    path = "/{id}/permissions",
    tag = "Groups",
    operation_id = "setGroupPermissions",
    summary = "Replace the permissions of an access group",
    description = "Members pick up the new permissions on their next login. Requires `group:manage` permission.",
    params(("id" = i32, Path, description = "Group ID")),
    request_body = SetPermissionsRequest,
    responses(
        (status = 200, description = "Permissions replaced", body = GroupResponse),
        (status = 400, description = "Unknown permission (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Group not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn set_group_permissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SetPermissionsRequest>,
) -> Result<Json<GroupResponse>, AppError> {
    auth_user.require_permission(GROUP_MANAGE)?;
    validate_permissions(&payload.permissions)?;

    let txn = state.db.begin().await?;
    let groups = GroupService::new(&txn);
    let group = groups.find(id).await?;
    groups.set_permissions(id, &payload.permissions).await?;
    let response = group_response(&txn, group).await?;
    txn.commit().await?;

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Groups",
    operation_id = "listPermissions",
    summary = "List the permission catalog",
    responses(
        (status = 200, description = "Grantable permissions", body = Vec<PermissionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user))]
pub async fn list_permissions(
    auth_user: AuthUser,
) -> Result<Json<Vec<PermissionResponse>>, AppError> {
    auth_user.require_permission(GROUP_VIEW)?;
    Ok(Json(
        permissions::CATALOG
            .iter()
            .map(|p| PermissionResponse {
                codename: p.codename,
                description: p.description,
            })
            .collect(),
    ))
}
