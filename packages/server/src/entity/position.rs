use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An authority level in the organisation (Staff, Supervisor, Manager, ...).
///
/// `parent_id` points at the direct superior position; it is resolved with
/// explicit queries rather than a declared self relation. The reference is
/// enforced by `seed::PARENT_FK` (`ON DELETE RESTRICT`).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "position")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    #[sea_orm(unique)]
    pub code: String,
    pub level: i32, // higher = more authority

    pub parent_id: Option<i32>,

    #[sea_orm(unique)]
    pub group_id: Option<i32>,
    #[sea_orm(belongs_to, from = "group_id", to = "id")]
    pub group: HasOne<super::access_group::Entity>,

    #[sea_orm(has_many)]
    pub employees: HasMany<super::user::Entity>,

    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for common::PositionState {
    fn from(m: &Model) -> Self {
        Self {
            name: m.name.clone(),
            code: m.code.clone(),
            level: m.level,
            parent_id: m.parent_id,
            is_active: m.is_active,
        }
    }
}
