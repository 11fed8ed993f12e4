use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Default page size for list endpoints.
pub const DEFAULT_PER_PAGE: u64 = 10;

/// Upper bound on the page size a client may request.
pub const MAX_PER_PAGE: u64 = 100;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 10)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 5)]
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(per_page);
        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

/// Normalize `page`/`per_page` query values: page >= 1, per_page in 1..=100.
pub fn page_params(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    (
        Ord::max(page.unwrap_or(1), 1),
        per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
    )
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a code: 1-20 characters of letters, digits, `-` or `_` after trimming.
pub fn validate_code(code: &str) -> Result<(), AppError> {
    let code = code.trim();
    if code.is_empty() || code.chars().count() > common::hierarchy::MAX_CODE_LEN {
        return Err(AppError::Validation("Code must be 1-20 characters".into()));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "Code must contain only letters, digits, '-' and '_'".into(),
        ));
    }
    Ok(())
}

/// Validate an `ORDER BY` direction (`asc` or `desc`).
pub fn parse_sort_order(order: Option<&str>) -> Result<sea_orm::Order, AppError> {
    match order {
        None | Some("desc") => Ok(sea_orm::Order::Desc),
        Some("asc") => Ok(sea_orm::Order::Asc),
        Some(_) => Err(AppError::Validation(
            "sort_order must be one of: asc, desc".into(),
        )),
    }
}
