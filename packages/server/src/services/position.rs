//! Position hierarchy maintenance.
//!
//! Every write re-checks the authority ordering (a parent must have a
//! strictly lower level than its subordinates) against the prospective
//! state before anything is persisted, and only fires the cascades the
//! change actually requires: a rename relabels the linked access group, a
//! new link target resynchronises the holders' memberships.
//!
//! All methods expect to run on a transaction owned by the caller; a
//! rejected change returns before anything is written.

use chrono::Utc;
use common::hierarchy::{self, HierarchyError, PositionDiff, PositionState};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use thiserror::Error;
use tracing::info;

use crate::entity::{position, user};
use crate::models::position::{PositionTreeNode, build_tree};
use crate::services::group::{GroupError, GroupService};
use crate::seed::PARENT_FK;
use crate::services::membership::MembershipSync;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error(transparent)]
    InvalidHierarchy(#[from] HierarchyError),

    #[error("position code '{0}' is already in use")]
    DuplicateCode(String),

    #[error("position still has {0} subordinate position(s); deactivate it instead")]
    HasSubordinates(u64),

    #[error("position is still held by {0} user(s); deactivate it instead")]
    HasHolders(u64),

    #[error("access group {0} is already linked to another position")]
    GroupAlreadyLinked(i32),

    #[error("access group name '{0}' is already in use")]
    GroupNameTaken(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<GroupError> for PositionError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::NameTaken(name) => PositionError::GroupNameTaken(name),
            GroupError::NotFound => PositionError::NotFound("Access group"),
            GroupError::Db(e) => PositionError::Db(e),
        }
    }
}

/// Input for [`PositionService::create`].
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub name: String,
    pub code: String,
    pub level: i32,
    pub parent_id: Option<i32>,
    /// Existing group to link. When absent a dedicated group is created.
    pub group_id: Option<i32>,
}

pub struct PositionService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> PositionService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find(&self, id: i32) -> Result<position::Model, PositionError> {
        position::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or(PositionError::NotFound("Position"))
    }

    async fn find_for_update(&self, id: i32) -> Result<position::Model, PositionError> {
        position::Entity::find_by_id(id)
            .lock(LockType::Update)
            .one(self.conn)
            .await?
            .ok_or(PositionError::NotFound("Position"))
    }

    /// Check the ordering between a (prospective) position and its parent.
    ///
    /// `id` is the position being changed, if it already exists; naming
    /// itself as parent compares the level against itself and fails.
    ///
    /// The parent row is share-locked until the caller's transaction ends, so
    /// a concurrent level change or delete of the parent waits for it (and
    /// vice versa, the check sees the parent's committed level).
    pub async fn validate(
        &self,
        id: Option<i32>,
        candidate: &PositionState,
    ) -> Result<(), PositionError> {
        let parent_level = match candidate.parent_id {
            Some(parent_id) if Some(parent_id) == id => Some(candidate.level),
            Some(parent_id) => Some(
                position::Entity::find_by_id(parent_id)
                    .lock(LockType::Share)
                    .one(self.conn)
                    .await?
                    .ok_or(PositionError::NotFound("Parent position"))?
                    .level,
            ),
            None => None,
        };
        hierarchy::validate(parent_level, candidate.level)?;
        Ok(())
    }

    /// All positions, lowest level first.
    pub async fn list_ordered(&self) -> Result<Vec<position::Model>, PositionError> {
        Ok(position::Entity::find()
            .order_by_asc(position::Column::Level)
            .order_by_asc(position::Column::Code)
            .all(self.conn)
            .await?)
    }

    /// The whole hierarchy as nested subordinates, roots first.
    pub async fn tree(&self) -> Result<Vec<PositionTreeNode>, PositionError> {
        Ok(build_tree(self.list_ordered().await?))
    }

    pub async fn create(&self, input: NewPosition) -> Result<position::Model, PositionError> {
        let state = PositionState {
            name: input.name.trim().to_string(),
            code: hierarchy::normalize_code(&input.code),
            level: input.level,
            parent_id: input.parent_id,
            is_active: true,
        };

        self.validate(None, &state).await?;
        self.ensure_code_free(&state.code, None).await?;

        let groups = GroupService::new(self.conn);
        let group_id = match input.group_id {
            Some(group_id) => {
                groups.find(group_id).await?;
                self.ensure_group_unlinked(group_id, None).await?;
                group_id
            }
            None => groups.create(&hierarchy::group_label(&state.name)).await?.id,
        };

        let now = Utc::now();
        let model = position::ActiveModel {
            name: Set(state.name),
            code: Set(state.code.clone()),
            level: Set(state.level),
            parent_id: Set(state.parent_id),
            group_id: Set(Some(group_id)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .map_err(|e| unique_violation(e, &state.code, Some(group_id)))?;

        info!(
            position_id = model.id,
            code = %model.code,
            level = model.level,
            group_id,
            "Created position"
        );
        Ok(model)
    }

    /// Apply a change set, firing only the cascades it requires.
    pub async fn update(
        &self,
        id: i32,
        diff: PositionDiff,
    ) -> Result<position::Model, PositionError> {
        let existing = self.find_for_update(id).await?;
        let current = PositionState::from(&existing);
        let diff = diff.against(&current);
        if diff.is_empty() {
            return Ok(existing);
        }

        let next = diff.prospective(&current);

        if diff.moves() {
            self.validate(Some(id), &next).await?;
        }
        if diff.level.is_some() {
            let subordinates = self.subordinates(id).await?;
            hierarchy::validate_subordinates(
                next.level,
                subordinates.iter().map(|p| (p.code.as_str(), p.level)),
            )?;
        }
        if let Some(ref code) = diff.code {
            self.ensure_code_free(code, Some(id)).await?;
        }

        if diff.renames()
            && let Some(group_id) = existing.group_id
        {
            GroupService::new(self.conn)
                .rename(group_id, &hierarchy::group_label(&next.name))
                .await?;
            info!(position_id = id, group_id, name = %next.name, "Relabelled position group");
        }

        let group_id = existing.group_id;
        let mut active: position::ActiveModel = existing.into();
        if diff.name.is_some() {
            active.name = Set(next.name);
        }
        if diff.code.is_some() {
            active.code = Set(next.code.clone());
        }
        if diff.level.is_some() {
            active.level = Set(next.level);
        }
        if diff.parent_id.is_some() {
            active.parent_id = Set(next.parent_id);
        }
        if diff.is_active.is_some() {
            active.is_active = Set(next.is_active);
        }
        active.updated_at = Set(Utc::now());

        Ok(active
            .update(self.conn)
            .await
            .map_err(|e| unique_violation(e, &next.code, group_id))?)
    }

    pub async fn rename(&self, id: i32, name: &str) -> Result<position::Model, PositionError> {
        self.update(
            id,
            PositionDiff {
                name: Some(name.trim().to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn change_code(&self, id: i32, code: &str) -> Result<position::Model, PositionError> {
        self.update(
            id,
            PositionDiff {
                code: Some(code.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn reparent(
        &self,
        id: i32,
        parent_id: Option<i32>,
    ) -> Result<position::Model, PositionError> {
        self.update(
            id,
            PositionDiff {
                parent_id: Some(parent_id),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn change_level(&self, id: i32, level: i32) -> Result<position::Model, PositionError> {
        self.update(
            id,
            PositionDiff {
                level: Some(level),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn soft_deactivate(&self, id: i32) -> Result<position::Model, PositionError> {
        self.set_active(id, false).await
    }

    pub async fn activate(&self, id: i32) -> Result<position::Model, PositionError> {
        self.set_active(id, true).await
    }

    async fn set_active(&self, id: i32, is_active: bool) -> Result<position::Model, PositionError> {
        let model = self
            .update(
                id,
                PositionDiff {
                    is_active: Some(is_active),
                    ..Default::default()
                },
            )
            .await?;
        info!(position_id = id, is_active, "Changed position status");
        Ok(model)
    }

    /// Point the position at another access group (or none) and resync its holders.
    ///
    /// Linking the group the position already has is a no-op.
    pub async fn link_group(
        &self,
        id: i32,
        group_id: Option<i32>,
    ) -> Result<position::Model, PositionError> {
        let existing = self.find_for_update(id).await?;
        if existing.group_id == group_id {
            return Ok(existing);
        }

        if let Some(group_id) = group_id {
            GroupService::new(self.conn).find(group_id).await?;
            self.ensure_group_unlinked(group_id, Some(id)).await?;
        }

        let sync = MembershipSync::new(self.conn);
        if let Some(old_group) = existing.group_id {
            sync.detach_group(id, old_group).await?;
        }

        let code = existing.code.clone();
        let mut active: position::ActiveModel = existing.into();
        active.group_id = Set(group_id);
        active.updated_at = Set(Utc::now());
        let model = active
            .update(self.conn)
            .await
            .map_err(|e| unique_violation(e, &code, group_id))?;

        let synced = sync.sync_members(&model).await?;
        info!(position_id = id, ?group_id, synced, "Linked position group");
        Ok(model)
    }

    /// Resynchronise the holders of a position with its linked group.
    pub async fn sync_members(&self, id: i32) -> Result<u64, PositionError> {
        let model = self.find(id).await?;
        Ok(MembershipSync::new(self.conn).sync_members(&model).await?)
    }

    /// Remove a leaf position and the access group it links to.
    pub async fn hard_delete(&self, id: i32) -> Result<(), PositionError> {
        let existing = self.find_for_update(id).await?;

        let subordinates = position::Entity::find()
            .filter(position::Column::ParentId.eq(id))
            .count(self.conn)
            .await?;
        if subordinates > 0 {
            return Err(PositionError::HasSubordinates(subordinates));
        }

        let holders = user::Entity::find()
            .filter(user::Column::PositionId.eq(id))
            .count(self.conn)
            .await?;
        if holders > 0 {
            return Err(PositionError::HasHolders(holders));
        }

        position::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(referenced_by)?;
        if let Some(group_id) = existing.group_id {
            GroupService::new(self.conn).delete(group_id).await?;
        }

        info!(
            position_id = id,
            code = %existing.code,
            group_id = ?existing.group_id,
            "Deleted position"
        );
        Ok(())
    }

    async fn subordinates(&self, id: i32) -> Result<Vec<position::Model>, DbErr> {
        position::Entity::find()
            .filter(position::Column::ParentId.eq(id))
            .all(self.conn)
            .await
    }

    async fn ensure_code_free(&self, code: &str, exclude: Option<i32>) -> Result<(), PositionError> {
        let mut query = position::Entity::find().filter(position::Column::Code.eq(code));
        if let Some(id) = exclude {
            query = query.filter(position::Column::Id.ne(id));
        }
        if query.count(self.conn).await? > 0 {
            return Err(PositionError::DuplicateCode(code.to_string()));
        }
        Ok(())
    }

    async fn ensure_group_unlinked(
        &self,
        group_id: i32,
        exclude: Option<i32>,
    ) -> Result<(), PositionError> {
        let mut query = position::Entity::find().filter(position::Column::GroupId.eq(group_id));
        if let Some(id) = exclude {
            query = query.filter(position::Column::Id.ne(id));
        }
        if query.count(self.conn).await? > 0 {
            return Err(PositionError::GroupAlreadyLinked(group_id));
        }
        Ok(())
    }
}

/// Map a foreign-key violation on deleting a position to its typed error.
///
/// Only reachable when a subordinate or holder appeared after the counts
/// were taken; the count reported is the one row the store complained about.
fn referenced_by(err: DbErr) -> PositionError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) if detail.contains(PARENT_FK) => {
            PositionError::HasSubordinates(1)
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => PositionError::HasHolders(1),
        _ => PositionError::Db(err),
    }
}

/// Map a unique-constraint violation on `position` to its typed error.
///
/// The store constraint is authoritative: pre-checks can race with a
/// concurrent writer.
fn unique_violation(err: DbErr, code: &str, group_id: Option<i32>) -> PositionError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("group_id") => {
            PositionError::GroupAlreadyLinked(group_id.unwrap_or_default())
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => PositionError::DuplicateCode(code.to_string()),
        _ => PositionError::Db(err),
    }
}
