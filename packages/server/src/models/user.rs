use chrono::{DateTime, NaiveDate, Utc};
use common::validators::{validate_email, validate_phone_number};
use common::{EmploymentStatus, EmploymentType};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::user;
use crate::error::AppError;

pub use super::shared::Pagination;
use super::shared::double_option;

/// Employee record as exposed by the API. Never includes credentials.
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "EMP-0042")]
    pub employee_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(example = "John Doe")]
    pub full_name: String,
    pub phone: String,
    pub division_id: Option<i32>,
    pub position_id: Option<i32>,
    pub hire_date: Option<NaiveDate>,
    pub employment_type: Option<EmploymentType>,
    pub status: EmploymentStatus,
    pub is_active: bool,
    pub is_superuser: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            full_name: m.full_name(),
            id: m.id,
            username: m.username,
            employee_id: m.employee_id,
            email: m.email,
            first_name: m.first_name,
            last_name: m.last_name,
            phone: m.phone,
            division_id: m.division_id,
            position_id: m.position_id,
            hire_date: m.hire_date,
            employment_type: m.employment_type,
            status: m.status,
            is_active: m.is_active,
            is_superuser: m.is_superuser,
            deleted_at: m.deleted_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Single user with the names of the groups they belong to.
#[derive(Serialize, ToSchema)]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    #[schema(example = json!(["Position: Supervisor"]))]
    pub groups: Vec<String>,
}

/// Partial update of an employee record.
///
/// Changing `position_id` moves the user into the new position's access group.
#[derive(Deserialize, Default, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub division_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub position_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub hire_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<EmploymentType>)]
    pub employment_type: Option<Option<EmploymentType>>,
    pub status: Option<EmploymentStatus>,
    pub is_active: Option<bool>,
}

pub fn validate_update_user(req: &UpdateUserRequest) -> Result<(), AppError> {
    if let Some(ref email) = req.email {
        validate_email(email.trim())?;
    }
    if let Some(ref phone) = req.phone {
        validate_phone_number(phone)?;
    }
    for name in [&req.first_name, &req.last_name].into_iter().flatten() {
        if name.chars().count() > 50 {
            return Err(AppError::Validation(
                "Names must be at most 50 characters".into(),
            ));
        }
    }
    Ok(())
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive match on username, names, e-mail or employee ID.
    pub search: Option<String>,
    pub division_id: Option<i32>,
    pub position_id: Option<i32>,
    pub status: Option<EmploymentStatus>,
    pub is_active: Option<bool>,
    /// Include soft-deleted users. Defaults to `false`.
    pub include_deleted: Option<bool>,
    /// Sort field: `created_at` (default), `username`, `employee_id`, `hire_date`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}
