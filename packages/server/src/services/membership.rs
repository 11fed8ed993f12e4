//! Projection of position holders onto the position's access group.
//!
//! A user's memberships in groups that are linked to *some* position are
//! derived state: they always equal the group of the position the user
//! holds. Memberships in groups no position links to are managed by hand
//! and are never touched here.
//!
//! Callers run these operations inside a transaction so that clearing and
//! re-adding a user's membership is observed as a single step.

use sea_orm::sea_query::{Query as SeaQuery, SelectStatement};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, Set};
use tracing::{debug, info};

use crate::entity::{position, user, user_group};

pub struct MembershipSync<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> MembershipSync<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Make every holder of `position` a member of exactly its linked group
    /// among position-derived groups. Returns the number of users synced.
    ///
    /// A position without a linked group is a no-op.
    pub async fn sync_members(&self, position: &position::Model) -> Result<u64, DbErr> {
        let Some(group_id) = position.group_id else {
            debug!(position_id = position.id, "No linked group, skipping member sync");
            return Ok(0);
        };

        let holders = self.holders(position.id).await?;
        if holders.is_empty() {
            return Ok(0);
        }

        user_group::Entity::delete_many()
            .filter(user_group::Column::UserId.is_in(holders.clone()))
            .filter(user_group::Column::GroupId.in_subquery(position_groups()))
            .exec(self.conn)
            .await?;

        user_group::Entity::insert_many(holders.iter().map(|&user_id| user_group::ActiveModel {
            user_id: Set(user_id),
            group_id: Set(group_id),
        }))
        .exec(self.conn)
        .await?;

        info!(
            position_id = position.id,
            group_id,
            users = holders.len(),
            "Synced position group members"
        );
        Ok(holders.len() as u64)
    }

    /// Re-derive one user's position membership after their position changed.
    pub async fn sync_user(&self, user_id: i32, position_id: Option<i32>) -> Result<(), DbErr> {
        user_group::Entity::delete_many()
            .filter(user_group::Column::UserId.eq(user_id))
            .filter(user_group::Column::GroupId.in_subquery(position_groups()))
            .exec(self.conn)
            .await?;

        let Some(position_id) = position_id else {
            return Ok(());
        };

        let group_id: Option<i32> = position::Entity::find_by_id(position_id)
            .select_only()
            .column(position::Column::GroupId)
            .into_tuple::<Option<i32>>()
            .one(self.conn)
            .await?
            .flatten();

        if let Some(group_id) = group_id {
            user_group::Entity::insert(user_group::ActiveModel {
                user_id: Set(user_id),
                group_id: Set(group_id),
            })
            .exec_without_returning(self.conn)
            .await?;
            debug!(user_id, position_id, group_id, "Synced user position group");
        }
        Ok(())
    }

    /// Remove the holders of `position_id` from `group_id`.
    ///
    /// Used when a position drops its link to a group: once unlinked, the
    /// group no longer counts as position-derived, so `sync_members` would
    /// leave those memberships behind.
    pub async fn detach_group(&self, position_id: i32, group_id: i32) -> Result<u64, DbErr> {
        let res = user_group::Entity::delete_many()
            .filter(user_group::Column::GroupId.eq(group_id))
            .filter(
                user_group::Column::UserId.in_subquery(
                    SeaQuery::select()
                        .column(user::Column::Id)
                        .from(user::Entity)
                        .and_where(user::Column::PositionId.eq(position_id))
                        .to_owned(),
                ),
            )
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }

    async fn holders(&self, position_id: i32) -> Result<Vec<i32>, DbErr> {
        user::Entity::find()
            .filter(user::Column::PositionId.eq(position_id))
            .select_only()
            .column(user::Column::Id)
            .into_tuple()
            .all(self.conn)
            .await
    }
}

/// `SELECT group_id FROM position WHERE group_id IS NOT NULL`
fn position_groups() -> SelectStatement {
    SeaQuery::select()
        .column(position::Column::GroupId)
        .from(position::Entity)
        .and_where(position::Column::GroupId.is_not_null())
        .to_owned()
}
