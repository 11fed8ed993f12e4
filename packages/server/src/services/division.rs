use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LockType, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use tracing::info;

use crate::entity::{division, user};
use crate::error::AppError;

/// Separator between ancestor names in a division path.
pub const PATH_SEPARATOR: &str = " / ";

/// How a division removal was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Employees or sub-divisions still reference it; marked inactive.
    Deactivated,
    Deleted,
}

/// Head-count summary of a division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionStats {
    pub employee_count: u64,
    pub active_employees: u64,
    pub inactive_employees: u64,
}

pub async fn find_division<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<division::Model, AppError> {
    division::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Division not found".into()))
}

async fn find_division_for_update<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<division::Model, AppError> {
    division::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Division not found".into()))
}

/// Level a division gets under `parent_id` (root = 0).
pub async fn level_under<C: ConnectionTrait>(
    db: &C,
    parent_id: Option<i32>,
) -> Result<i32, AppError> {
    match parent_id {
        Some(pid) => {
            let parent = division::Entity::find_by_id(pid)
                .one(db)
                .await?
                .ok_or_else(|| AppError::NotFound("Parent division not found".into()))?;
            Ok(parent.level + 1)
        }
        None => Ok(0),
    }
}

/// Reject a code that another division already uses.
pub async fn ensure_code_free<C: ConnectionTrait>(
    db: &C,
    code: &str,
    exclude: Option<i32>,
) -> Result<(), AppError> {
    let mut query = division::Entity::find().filter(division::Column::Code.eq(code));
    if let Some(id) = exclude {
        query = query.filter(division::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        return Err(AppError::DuplicateCode(format!(
            "Division with code '{code}' already exists"
        )));
    }
    Ok(())
}

/// Move `id` under `new_parent`, refusing cycles, and re-level its subtree.
pub async fn reparent<C: ConnectionTrait>(
    db: &C,
    id: i32,
    new_parent: Option<i32>,
) -> Result<i32, AppError> {
    let mut cursor = new_parent;
    let mut seen = HashSet::new();
    while let Some(ancestor) = cursor {
        if ancestor == id {
            return Err(AppError::InvalidHierarchy(
                "Division cannot be placed under itself or one of its sub-divisions".into(),
            ));
        }
        if !seen.insert(ancestor) {
            break;
        }
        cursor = find_division(db, ancestor).await?.parent_id;
    }

    let level = level_under(db, new_parent).await?;
    relevel_children(db, id, level).await?;
    Ok(level)
}

async fn relevel_children<C: ConnectionTrait>(
    db: &C,
    root: i32,
    root_level: i32,
) -> Result<(), AppError> {
    let mut frontier = vec![(root, root_level)];
    while let Some((parent, parent_level)) = frontier.pop() {
        let children = division::Entity::find()
            .filter(division::Column::ParentId.eq(parent))
            .all(db)
            .await?;
        for child in children {
            let child_id = child.id;
            let mut active: division::ActiveModel = child.into();
            active.level = Set(parent_level + 1);
            active.update(db).await?;
            frontier.push((child_id, parent_level + 1));
        }
    }
    Ok(())
}

/// Deactivate a division that is still referenced, delete it otherwise.
pub async fn remove<C: ConnectionTrait>(db: &C, id: i32) -> Result<RemoveOutcome, AppError> {
    let existing = find_division_for_update(db, id).await?;

    let employees = user::Entity::find()
        .filter(user::Column::DivisionId.eq(id))
        .count(db)
        .await?;
    let children = division::Entity::find()
        .filter(division::Column::ParentId.eq(id))
        .count(db)
        .await?;

    if employees > 0 || children > 0 {
        let mut active: division::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        info!(division_id = id, employees, children, "Deactivated division");
        return Ok(RemoveOutcome::Deactivated);
    }

    division::Entity::delete_by_id(id).exec(db).await?;
    info!(division_id = id, code = %existing.code, "Deleted division");
    Ok(RemoveOutcome::Deleted)
}

/// Ancestor names from the root down to `division`, joined by [`PATH_SEPARATOR`].
pub async fn full_path<C: ConnectionTrait>(
    db: &C,
    division: &division::Model,
) -> Result<String, AppError> {
    let mut names = vec![division.name.clone()];
    let mut seen = HashSet::from([division.id]);
    let mut cursor = division.parent_id;
    while let Some(id) = cursor {
        if !seen.insert(id) {
            break;
        }
        let parent = find_division(db, id).await?;
        names.push(parent.name);
        cursor = parent.parent_id;
    }
    names.reverse();
    Ok(names.join(PATH_SEPARATOR))
}

/// Head counts for a division, taken in a single aggregate so the totals
/// always agree with each other.
pub async fn statistics<C: ConnectionTrait>(db: &C, id: i32) -> Result<DivisionStats, AppError> {
    let (total, active): (i64, i64) = user::Entity::find()
        .select_only()
        .column_as(SimpleExpr::from(Func::count(Expr::col(user::Column::Id))), "total")
        .column_as(Expr::cust("COUNT(*) FILTER (WHERE is_active)"), "active")
        .filter(user::Column::DivisionId.eq(id))
        .into_tuple()
        .one(db)
        .await?
        .unwrap_or_default();
    Ok(DivisionStats::from_counts(total, active))
}

impl DivisionStats {
    fn from_counts(total: i64, active: i64) -> Self {
        let employee_count = u64::try_from(total).unwrap_or_default();
        let active_employees = u64::try_from(active).unwrap_or_default().min(employee_count);
        Self {
            employee_count,
            active_employees,
            inactive_employees: employee_count - active_employees,
        }
    }
}
