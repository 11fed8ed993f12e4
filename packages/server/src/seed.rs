use common::permissions;
use sea_orm::sea_query::{ForeignKey, ForeignKeyAction, Index, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{access_group, group_permission, position, user};

/// Name of the group seeded with the whole permission catalog.
pub const ADMIN_GROUP: &str = "Administrators";

/// Self-reference from `position.parent_id` to `position.id`.
pub const PARENT_FK: &str = "fk_position_parent";

/// Seed the administrators group and grant it every catalog permission.
pub async fn seed_admin_group(db: &DatabaseConnection) -> Result<(), DbErr> {
    let result = access_group::Entity::insert(access_group::ActiveModel {
        name: Set(ADMIN_GROUP.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(access_group::Column::Name)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }

    let group = access_group::Entity::find()
        .filter(access_group::Column::Name.eq(ADMIN_GROUP))
        .one(db)
        .await?
        .ok_or(DbErr::RecordNotFound(ADMIN_GROUP.to_string()))?;

    let mut inserted = 0u32;
    for perm in permissions::CATALOG {
        let result = group_permission::Entity::insert(group_permission::ActiveModel {
            group_id: Set(group.id),
            permission: Set(perm.codename.to_string()),
        })
        .on_conflict(
            OnConflict::columns([
                group_permission::Column::GroupId,
                group_permission::Column::Permission,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await;

        match result {
            Ok(n) if n > 0 => inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!(group_id = group.id, "Granted {} permissions to {}", inserted, ADMIN_GROUP);
    }

    Ok(())
}

/// Ensure constraints that schema-sync can't express.
///
/// Unlike indexes these are required: a missing parent reference check
/// would let a delete strand subordinates, so failures abort startup.
pub async fn ensure_constraints(db: &DatabaseConnection) -> Result<(), DbErr> {
    let exists = db
        .query_one_raw(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT 1 FROM pg_constraint WHERE conname = $1",
            [PARENT_FK.into()],
        ))
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    let stmt = ForeignKey::create()
        .name(PARENT_FK)
        .from(position::Entity, position::Column::ParentId)
        .to(position::Entity, position::Column::Id)
        .on_delete(ForeignKeyAction::Restrict)
        .on_update(ForeignKeyAction::NoAction)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;
    info!("Added constraint {}", PARENT_FK);
    Ok(())
}

/// Ensure indexes that schema-sync can't express.
///
/// Failures are logged and do not abort startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        (
            "idx_position_level_code",
            Index::create()
                .if_not_exists()
                .unique()
                .name("idx_position_level_code")
                .table(position::Entity)
                .col(position::Column::Level)
                .col(position::Column::Code)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_position_parent",
            Index::create()
                .if_not_exists()
                .name("idx_position_parent")
                .table(position::Entity)
                .col(position::Column::ParentId)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_user_status_active",
            Index::create()
                .if_not_exists()
                .name("idx_user_status_active")
                .table(user::Entity)
                .col(user::Column::Status)
                .col(user::Column::IsActive)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_user_division_active",
            Index::create()
                .if_not_exists()
                .name("idx_user_division_active")
                .table(user::Entity)
                .col(user::Column::DivisionId)
                .col(user::Column::IsActive)
                .to_string(PostgresQueryBuilder),
        ),
    ];

    for (name, stmt) in statements {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
