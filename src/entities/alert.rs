use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `source_id` deliberately has no foreign key: alerts outlive the asset.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub source_kind: String,
    pub source_id: Uuid,
    pub location: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub raised_at: DateTime,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime>,
    pub acknowledged_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
