use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored status of a payment obligation.
///
/// "Overdue" is a derived listing filter (pending + past due date), never a
/// stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentDueStatus {
    Pending,
    Paid,
}

impl PaymentDueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentDueStatus::Pending => "pending",
            PaymentDueStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(PaymentDueStatus::Pending),
            "paid" => Some(PaymentDueStatus::Paid),
            _ => None,
        }
    }
}

/// Obligation derived from a sale committed with `pending` status.
///
/// At most one per sale; its lifecycle is independent of the sale's (a
/// reversal does not touch it).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_dues")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sale_id: Uuid,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sale::Entity",
        from = "Column::SaleId",
        to = "super::sale::Column::Id"
    )]
    Sale,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
