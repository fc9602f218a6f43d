//! `SeaORM` Entity for inventory_expenses table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub position_id: Uuid,
    pub customer_id: Uuid,
    pub quality_type: String,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub weight_loss: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub expenditure: Decimal,
    pub is_processing: bool,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub old_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub new_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))")]
    pub old_avg_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))")]
    pub new_avg_cost: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_positions::Entity",
        from = "Column::PositionId",
        to = "super::inventory_positions::Column::Id"
    )]
    InventoryPositions,
}

impl Related<super::inventory_positions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryPositions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
