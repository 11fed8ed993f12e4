use common::validators::{validate_email, validate_phone_number};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Request body for employee account registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "jdoe")]
    pub username: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// Unique employee number.
    #[schema(example = "EMP-0042")]
    pub employee_id: String,
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    /// Digits only, starting with `08` or `62`.
    #[schema(example = "081234567890")]
    pub phone: Option<String>,
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_username(&payload.username)?;
    validate_password(&payload.password)?;
    let employee_id = payload.employee_id.trim();
    if employee_id.is_empty() || employee_id.chars().count() > 20 {
        return Err(AppError::Validation(
            "Employee ID must be 1-20 characters".into(),
        ));
    }
    validate_email(payload.email.trim())?;
    if let Some(ref phone) = payload.phone {
        validate_phone_number(phone)?;
    }
    Ok(())
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful registration response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "EMP-0042")]
    pub employee_id: String,
}

impl From<crate::entity::user::Model> for RegisterResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            employee_id: user.employee_id,
        }
    }
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    #[schema(example = "jdoe")]
    pub username: String,
    /// Union of the permissions granted by the user's groups.
    #[schema(example = json!(["position:view"]))]
    pub permissions: Vec<String>,
}

/// Current authenticated user's profile.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "John Doe")]
    pub full_name: String,
    pub email: String,
    pub employee_id: String,
    pub division_id: Option<i32>,
    pub position_id: Option<i32>,
    pub is_superuser: bool,
    /// Names of the access groups the user belongs to.
    #[schema(example = json!(["Position: Supervisor"]))]
    pub groups: Vec<String>,
    /// Permissions carried by the presented token.
    #[schema(example = json!(["position:view"]))]
    pub permissions: Vec<String>,
}

/// Request body for changing one's own password.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
