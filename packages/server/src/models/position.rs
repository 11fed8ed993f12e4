use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::hierarchy::{LEVEL_RANGE, MAX_NAME_LEN, PositionDiff};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::position;
use crate::error::AppError;

pub use super::shared::Pagination;
use super::shared::{double_option, validate_code};

/// Request body for creating a position.
#[derive(Deserialize, ToSchema)]
pub struct CreatePositionRequest {
    /// Display name.
    #[schema(example = "Supervisor")]
    pub name: String,
    /// Unique short code; stored upper-cased.
    #[schema(example = "SPV")]
    pub code: String,
    /// Authority level, higher outranks lower.
    #[schema(example = 2)]
    pub level: i32,
    /// Direct superior position; must have a lower level.
    #[schema(example = 1)]
    pub parent_id: Option<i32>,
    /// Existing access group to link. A new group named `Position: {name}` is created when omitted.
    pub group_id: Option<i32>,
}

/// Partial update of a position. Only provided fields are changed.
#[derive(Debug, Deserialize, Default, PartialEq, ToSchema)]
pub struct UpdatePositionRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub level: Option<i32>,
    /// `null` detaches the position from its parent.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub parent_id: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

impl From<UpdatePositionRequest> for PositionDiff {
    fn from(req: UpdatePositionRequest) -> Self {
        Self {
            name: req.name.map(|n| n.trim().to_string()),
            code: req.code,
            level: req.level,
            parent_id: req.parent_id,
            is_active: req.is_active,
        }
    }
}

/// Request body for changing the access group linked to a position.
#[derive(Deserialize, ToSchema)]
pub struct LinkGroupRequest {
    /// Group to link, or `null` to unlink.
    pub group_id: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct PositionResponse {
    #[schema(example = 2)]
    pub id: i32,
    #[schema(example = "Supervisor")]
    pub name: String,
    #[schema(example = "SPV")]
    pub code: String,
    #[schema(example = 2)]
    pub level: i32,
    pub parent_id: Option<i32>,
    pub group_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<position::Model> for PositionResponse {
    fn from(m: position::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            code: m.code,
            level: m.level,
            parent_id: m.parent_id,
            group_id: m.group_id,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PositionListResponse {
    pub data: Vec<PositionResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PositionListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive match on name or code.
    pub search: Option<String>,
    pub level: Option<i32>,
    pub is_active: Option<bool>,
    pub parent_id: Option<i32>,
}

/// A position with its direct subordinates, recursively.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct PositionTreeNode {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub level: i32,
    pub is_active: bool,
    pub group_id: Option<i32>,
    #[schema(no_recursion)]
    pub subordinates: Vec<PositionTreeNode>,
}

#[derive(Serialize, ToSchema)]
pub struct SyncMembersResponse {
    pub position_id: i32,
    pub group_id: Option<i32>,
    /// Number of holders whose membership was re-derived.
    #[schema(example = 2)]
    pub synced: u64,
}

/// Arrange positions into trees rooted at positions without a parent.
///
/// Expects the whole table: every `parent_id` must name a position in
/// `positions`. Siblings keep the order of the input, so pass positions
/// sorted by level and code.
pub fn build_tree(positions: Vec<position::Model>) -> Vec<PositionTreeNode> {
    let mut children: HashMap<i32, Vec<position::Model>> = HashMap::new();
    let mut roots = Vec::new();

    for p in positions {
        match p.parent_id {
            Some(parent) => children.entry(parent).or_default().push(p),
            None => roots.push(p),
        }
    }

    roots
        .into_iter()
        .map(|p| attach(p, &mut children))
        .collect()
}

fn attach(p: position::Model, children: &mut HashMap<i32, Vec<position::Model>>) -> PositionTreeNode {
    let subordinates = children
        .remove(&p.id)
        .unwrap_or_default()
        .into_iter()
        .map(|c| attach(c, children))
        .collect();
    PositionTreeNode {
        id: p.id,
        name: p.name,
        code: p.code,
        level: p.level,
        is_active: p.is_active,
        group_id: p.group_id,
        subordinates,
    }
}

fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(
            "Name must be 1-100 characters".into(),
        ));
    }
    Ok(())
}

fn validate_level(level: i32) -> Result<(), AppError> {
    if !LEVEL_RANGE.contains(&level) {
        return Err(AppError::Validation("Level must be 1-32767".into()));
    }
    Ok(())
}

pub fn validate_create_position(req: &CreatePositionRequest) -> Result<(), AppError> {
    validate_name(&req.name)?;
    validate_code(&req.code)?;
    validate_level(req.level)
}

pub fn validate_update_position(req: &UpdatePositionRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name)?;
    }
    if let Some(ref code) = req.code {
        validate_code(code)?;
    }
    if let Some(level) = req.level {
        validate_level(level)?;
    }
    Ok(())
}
