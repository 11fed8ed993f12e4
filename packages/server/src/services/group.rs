use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};
use thiserror::Error;
use tracing::debug;

use crate::entity::{access_group, group_permission, user_group};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("access group name '{0}' is already in use")]
    NameTaken(String),

    #[error("access group not found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Storage operations on access groups and their permission grants.
pub struct GroupService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> GroupService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find(&self, id: i32) -> Result<access_group::Model, GroupError> {
        access_group::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or(GroupError::NotFound)
    }

    pub async fn create(&self, name: &str) -> Result<access_group::Model, GroupError> {
        let model = access_group::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let group = model
            .insert(self.conn)
            .await
            .map_err(|e| name_taken_or(e, name))?;
        debug!(group_id = group.id, name = %group.name, "Created access group");
        Ok(group)
    }

    pub async fn rename(&self, id: i32, name: &str) -> Result<access_group::Model, GroupError> {
        let group = self.find(id).await?;
        if group.name == name {
            return Ok(group);
        }

        let mut active: access_group::ActiveModel = group.into();
        active.name = Set(name.to_string());
        active
            .update(self.conn)
            .await
            .map_err(|e| name_taken_or(e, name))
    }

    /// Delete a group together with its permission grants and memberships.
    pub async fn delete(&self, id: i32) -> Result<(), DbErr> {
        user_group::Entity::delete_many()
            .filter(user_group::Column::GroupId.eq(id))
            .exec(self.conn)
            .await?;
        group_permission::Entity::delete_many()
            .filter(group_permission::Column::GroupId.eq(id))
            .exec(self.conn)
            .await?;
        access_group::Entity::delete_by_id(id)
            .exec(self.conn)
            .await?;
        debug!(group_id = id, "Deleted access group");
        Ok(())
    }

    /// Replace the permission grants of a group.
    pub async fn set_permissions(&self, id: i32, permissions: &[String]) -> Result<(), DbErr> {
        group_permission::Entity::delete_many()
            .filter(group_permission::Column::GroupId.eq(id))
            .exec(self.conn)
            .await?;

        let unique: BTreeSet<&String> = permissions.iter().collect();
        if unique.is_empty() {
            return Ok(());
        }

        group_permission::Entity::insert_many(unique.into_iter().map(|p| {
            group_permission::ActiveModel {
                group_id: Set(id),
                permission: Set(p.clone()),
            }
        }))
        .exec(self.conn)
        .await?;
        Ok(())
    }

    pub async fn permissions(&self, id: i32) -> Result<Vec<String>, DbErr> {
        group_permission::Entity::find()
            .filter(group_permission::Column::GroupId.eq(id))
            .order_by_asc(group_permission::Column::Permission)
            .select_only()
            .column(group_permission::Column::Permission)
            .into_tuple()
            .all(self.conn)
            .await
    }

    /// Union of the permissions granted by every group the user belongs to.
    pub async fn permissions_for_user(&self, user_id: i32) -> Result<Vec<String>, DbErr> {
        group_permission::Entity::find()
            .filter(
                group_permission::Column::GroupId.in_subquery(
                    SeaQuery::select()
                        .column(user_group::Column::GroupId)
                        .from(user_group::Entity)
                        .and_where(user_group::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            )
            .select_only()
            .column(group_permission::Column::Permission)
            .distinct()
            .order_by_asc(group_permission::Column::Permission)
            .into_tuple()
            .all(self.conn)
            .await
    }

    /// Names of the groups a user belongs to.
    pub async fn group_names_for_user(&self, user_id: i32) -> Result<Vec<String>, DbErr> {
        access_group::Entity::find()
            .filter(
                access_group::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(user_group::Column::GroupId)
                        .from(user_group::Entity)
                        .and_where(user_group::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            )
            .order_by_asc(access_group::Column::Name)
            .select_only()
            .column(access_group::Column::Name)
            .into_tuple()
            .all(self.conn)
            .await
    }
}

fn name_taken_or(err: DbErr, name: &str) -> GroupError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => GroupError::NameTaken(name.to_string()),
        _ => GroupError::Db(err),
    }
}
