use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named bundle of permission grants.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "access_group")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(has_one)]
    pub position: HasOne<super::position::Entity>,

    #[sea_orm(has_many)]
    pub permissions: HasMany<super::group_permission::Entity>,

    #[sea_orm(has_many, via = "user_group")]
    pub users: HasMany<super::user::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
