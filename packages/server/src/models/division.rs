use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::division;
use crate::error::AppError;
use crate::services::division::{DivisionStats, RemoveOutcome};

pub use super::shared::Pagination;
use super::shared::{double_option, validate_code};

#[derive(Deserialize, ToSchema)]
pub struct CreateDivisionRequest {
    /// Unique code; stored upper-cased.
    #[schema(example = "ENG")]
    pub code: String,
    /// At least 3 characters.
    #[schema(example = "Engineering")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Parent division. The new division sits one level below it.
    pub parent_id: Option<i32>,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct UpdateDivisionRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// `null` turns the division into a root.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub parent_id: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    let len = name.trim().chars().count();
    if !(3..=100).contains(&len) {
        return Err(AppError::Validation(
            "Division name must be 3-100 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_division(req: &CreateDivisionRequest) -> Result<(), AppError> {
    validate_code(&req.code)?;
    validate_name(&req.name)
}

pub fn validate_update_division(req: &UpdateDivisionRequest) -> Result<(), AppError> {
    if let Some(ref code) = req.code {
        validate_code(code)?;
    }
    if let Some(ref name) = req.name {
        validate_name(name)?;
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct DivisionResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "ENG")]
    pub code: String,
    #[schema(example = "Engineering")]
    pub name: String,
    pub description: String,
    pub parent_id: Option<i32>,
    /// Depth in the division tree (root = 0).
    pub level: i32,
    /// Names from the root down, e.g. `Head Office / Engineering`.
    #[schema(example = "Head Office / Engineering")]
    pub full_path: String,
    pub employee_count: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DivisionResponse {
    pub fn new(m: division::Model, full_path: String, employee_count: u64) -> Self {
        Self {
            id: m.id,
            code: m.code,
            name: m.name,
            description: m.description,
            parent_id: m.parent_id,
            level: m.level,
            full_path,
            employee_count,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DivisionListItem {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub parent_id: Option<i32>,
    pub level: i32,
    pub is_active: bool,
}

impl From<division::Model> for DivisionListItem {
    fn from(m: division::Model) -> Self {
        Self {
            id: m.id,
            code: m.code,
            name: m.name,
            parent_id: m.parent_id,
            level: m.level,
            is_active: m.is_active,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DivisionListResponse {
    pub data: Vec<DivisionListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DivisionListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive match on name, code or description.
    pub search: Option<String>,
    pub parent_id: Option<i32>,
    pub is_active: Option<bool>,
    /// Sort field: `name` (default), `code`, `created_at`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DivisionStatsResponse {
    pub division_id: i32,
    #[schema(example = 12)]
    pub employee_count: u64,
    #[schema(example = 10)]
    pub active_employees: u64,
    #[schema(example = 2)]
    pub inactive_employees: u64,
}

impl DivisionStatsResponse {
    pub fn new(division_id: i32, stats: DivisionStats) -> Self {
        Self {
            division_id,
            employee_count: stats.employee_count,
            active_employees: stats.active_employees,
            inactive_employees: stats.inactive_employees,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DeleteDivisionResponse {
    /// `true` when the division was only deactivated because it is still referenced.
    pub deactivated: bool,
}

impl From<RemoveOutcome> for DeleteDivisionResponse {
    fn from(outcome: RemoveOutcome) -> Self {
        Self {
            deactivated: outcome == RemoveOutcome::Deactivated,
        }
    }
}
