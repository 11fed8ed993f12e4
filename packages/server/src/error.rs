use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::validators::ContactError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::services::group::GroupError;
use crate::services::position::PositionError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `INVALID_HIERARCHY`,
    /// `DUPLICATE_CODE`, `HAS_SUBORDINATES`, `TOKEN_MISSING`, `TOKEN_INVALID`,
    /// `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`,
    /// `USERNAME_TAKEN`, `INTERNAL_ERROR`.
    #[schema(example = "INVALID_HIERARCHY")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "parent position must have lower level than this position")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// A parent would not outrank its subordinate.
    InvalidHierarchy(String),
    DuplicateCode(String),
    /// Hard delete blocked by subordinate positions.
    HasSubordinates(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    NotFound(String),
    Conflict(String),
    UsernameTaken,
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::InvalidHierarchy(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_HIERARCHY",
                    message: msg,
                },
            ),
            AppError::DuplicateCode(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "DUPLICATE_CODE",
                    message: msg,
                },
            ),
            AppError::HasSubordinates(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "HAS_SUBORDINATES",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid username or password".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "USERNAME_TAKEN",
                    message: "Username is already taken".into(),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ContactError> for AppError {
    fn from(err: ContactError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<PositionError> for AppError {
    fn from(err: PositionError) -> Self {
        match err {
            PositionError::InvalidHierarchy(e) => {
                tracing::debug!("Rejected hierarchy change: {e}");
                AppError::InvalidHierarchy(e.to_string())
            }
            PositionError::DuplicateCode(_) => AppError::DuplicateCode(err.to_string()),
            PositionError::HasSubordinates(_) => AppError::HasSubordinates(err.to_string()),
            PositionError::HasHolders(_)
            | PositionError::GroupAlreadyLinked(_)
            | PositionError::GroupNameTaken(_) => AppError::Conflict(err.to_string()),
            PositionError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            PositionError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<GroupError> for AppError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::NameTaken(_) => AppError::Conflict(err.to_string()),
            GroupError::NotFound => AppError::NotFound("Access group not found".into()),
            GroupError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}
