use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states of a sale.
///
/// `Refunded` and `Voided` are terminal; the only post-creation transition
/// is `Completed|Pending -> Refunded|Voided` through the reversal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleStatus {
    Completed,
    Pending,
    Refunded,
    Voided,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Pending => "pending",
            SaleStatus::Refunded => "refunded",
            SaleStatus::Voided => "voided",
        }
    }

    /// Parses a status string, tolerating any casing.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completed" => Some(SaleStatus::Completed),
            "pending" => Some(SaleStatus::Pending),
            "refunded" => Some(SaleStatus::Refunded),
            "voided" => Some(SaleStatus::Voided),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Refunded | SaleStatus::Voided)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_method: String,
    pub status: String, // stored as string, converted through SaleStatus
    pub customer_name: Option<String>,
    pub cashier_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_line::Entity")]
    SaleLine,
    #[sea_orm(has_many = "super::payment_due::Entity")]
    PaymentDue,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CashierId",
        to = "super::user::Column::Id"
    )]
    Cashier,
}

impl Related<super::sale_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleLine.def()
    }
}

impl Related<super::payment_due::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentDue.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cashier.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(SaleStatus::parse("PENDING"), Some(SaleStatus::Pending));
        assert_eq!(SaleStatus::parse(" Completed "), Some(SaleStatus::Completed));
        assert_eq!(SaleStatus::parse("settled"), None);
    }

    #[test]
    fn only_refunded_and_voided_are_terminal() {
        assert!(SaleStatus::Refunded.is_terminal());
        assert!(SaleStatus::Voided.is_terminal());
        assert!(!SaleStatus::Completed.is_terminal());
        assert!(!SaleStatus::Pending.is_terminal());
    }
}
