use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "fire_extinguishers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub status: String,
    pub last_refill: DateTime,
    pub next_refill_due: DateTime,
    pub last_pressure_test: DateTime,
    pub next_pressure_test_due: DateTime,
    pub last_triggered: Option<DateTime>,
    pub dispatch_status: String,
    pub dispatch_date: Option<DateTime>,
    pub received_date: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
