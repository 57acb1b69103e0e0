use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock-bearing inventory item.
///
/// `stock` is an exact decimal quantity and must never go negative after a
/// committed mutation; the stock ledger enforces this with a conditional
/// update rather than an in-memory check.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub stock: Decimal,
    pub min_stock_level: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_line::Entity")]
    SaleLine,
}

impl Related<super::sale_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
