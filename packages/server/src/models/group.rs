use chrono::{DateTime, Utc};
use common::permissions;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::access_group;
use crate::error::AppError;

#[derive(Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    #[schema(example = "Payroll officers")]
    pub name: String,
    /// Permission codenames to grant. Defaults to none.
    #[serde(default)]
    #[schema(example = json!(["user:view"]))]
    pub permissions: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetPermissionsRequest {
    /// Full replacement set of permission codenames.
    #[schema(example = json!(["position:view", "position:edit"]))]
    pub permissions: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct GroupResponse {
    pub id: i32,
    #[schema(example = "Position: Supervisor")]
    pub name: String,
    /// Position this group is linked to, if any.
    pub position_id: Option<i32>,
    pub permissions: Vec<String>,
    pub member_count: u64,
    pub created_at: DateTime<Utc>,
}

impl GroupResponse {
    pub fn new(
        group: access_group::Model,
        position_id: Option<i32>,
        permissions: Vec<String>,
        member_count: u64,
    ) -> Self {
        Self {
            id: group.id,
            name: group.name,
            position_id,
            permissions,
            member_count,
            created_at: group.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PermissionResponse {
    #[schema(example = "position:view")]
    pub codename: &'static str,
    #[schema(example = "Can view positions")]
    pub description: &'static str,
}

pub fn validate_group_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 150 {
        return Err(AppError::Validation(
            "Group name must be 1-150 characters".into(),
        ));
    }
    Ok(())
}

/// Reject codenames outside the permission catalog.
pub fn validate_permissions(perms: &[String]) -> Result<(), AppError> {
    if let Some(unknown) = perms.iter().find(|p| !permissions::is_known(p)) {
        return Err(AppError::Validation(format!(
            "Unknown permission '{unknown}'"
        )));
    }
    Ok(())
}
