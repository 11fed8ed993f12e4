use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An organisational unit. Divisions nest through `parent_id`; `level` is
/// derived from the parent chain (root = 0).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "division")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub parent_id: Option<i32>,
    pub level: i32,

    #[sea_orm(has_many)]
    pub employees: HasMany<super::user::Entity>,

    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
