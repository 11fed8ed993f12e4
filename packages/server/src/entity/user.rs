use common::{EmploymentStatus, EmploymentType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    pub password: String,

    #[sea_orm(unique)]
    pub employee_id: String,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,

    pub division_id: Option<i32>,
    #[sea_orm(belongs_to, from = "division_id", to = "id")]
    pub division: HasOne<super::division::Entity>,

    pub position_id: Option<i32>,
    #[sea_orm(belongs_to, from = "position_id", to = "id")]
    pub position: HasOne<super::position::Entity>,

    #[sea_orm(has_many, via = "user_group")]
    pub groups: HasMany<super::access_group::Entity>,

    pub hire_date: Option<Date>,
    pub employment_type: Option<EmploymentType>,
    pub status: EmploymentStatus,

    /// Opaque face-recognition encoding, produced by an external service.
    pub face_encoding: Option<Json>,

    pub is_active: bool,
    pub is_superuser: bool,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<i32>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}
