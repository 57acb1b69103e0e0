use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{payment_due, sale, sale_line, user};
use crate::entities::payment_due::PaymentDueStatus;
use crate::entities::sale::SaleStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock::StockLedger;

/// One line of a sale being created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineRequest {
    /// Client-chosen line id; generated when omitted
    #[serde(default)]
    pub id: Option<Uuid>,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Line total as computed by the register client
    pub total: Decimal,
}

/// Request payload for creating a sale
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateSaleRequest {
    /// Client-chosen sale id, usable as a retry key; generated when omitted
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Sale timestamp; defaults to now when omitted
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Sale subtotal; zero means "derive from the line totals"
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    /// Sale total; zero means "derive as subtotal + tax"
    #[serde(default)]
    pub total: Decimal,
    #[validate(length(min = 1, message = "payment_method is required"))]
    pub payment_method: String,
    pub status: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub cashier_id: Uuid,
    #[validate(
        length(min = 1, message = "a sale needs at least one line"),
        custom = "validate_lines"
    )]
    pub lines: Vec<SaleLineRequest>,
}

fn validate_lines(lines: &Vec<SaleLineRequest>) -> Result<(), validator::ValidationError> {
    for line in lines {
        if line.quantity <= Decimal::ZERO {
            let mut err = validator::ValidationError::new("quantity");
            err.message = Some("line quantity must be positive".into());
            return Err(err);
        }
        if line.price < Decimal::ZERO || line.total < Decimal::ZERO {
            let mut err = validator::ValidationError::new("amount");
            err.message = Some("line price and total must not be negative".into());
            return Err(err);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaleResponse {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_method: String,
    pub status: String,
    pub customer_name: Option<String>,
    pub cashier_id: Uuid,
    pub lines: Vec<SaleLineResponse>,
}

/// List entry without lines
#[derive(Debug, Serialize, Deserialize)]
pub struct SaleSummary {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_method: String,
    pub status: String,
    pub customer_name: Option<String>,
    pub cashier_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaleListResponse {
    pub sales: Vec<SaleSummary>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Derives the sale totals from what the register sent.
///
/// A zero subtotal means the client left derivation to the server: it
/// becomes the sum of the line totals. Likewise a zero total becomes
/// subtotal + tax. Non-zero figures are kept exactly as sent.
pub fn resolve_sale_totals(
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
    lines: &[SaleLineRequest],
) -> (Decimal, Decimal) {
    let subtotal = if subtotal.is_zero() {
        lines.iter().map(|l| l.total).sum()
    } else {
        subtotal
    };
    let total = if total.is_zero() { subtotal + tax } else { total };
    (subtotal, total)
}

/// Service for recording and reversing sale transactions
#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    /// Days granted to a pending sale before its payment falls due
    payment_due_grace_days: i64,
}

impl SaleService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        payment_due_grace_days: i64,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            payment_due_grace_days,
        }
    }

    /// Records a sale atomically.
    ///
    /// Within one transaction: verifies the cashier, decrements stock for
    /// every line under a sufficient-stock guard, persists the sale with
    /// its lines, and for a pending sale opens a payment due worth the
    /// sale total. Any failure rolls the whole transaction back.
    #[instrument(skip(self, request), fields(cashier_id = %request.cashier_id, line_count = request.lines.len()))]
    pub async fn create_sale(
        &self,
        request: CreateSaleRequest,
    ) -> Result<SaleResponse, ServiceError> {
        request.validate()?;

        let status = SaleStatus::parse(&request.status).ok_or_else(|| {
            ServiceError::ValidationError(format!("unknown sale status '{}'", request.status))
        })?;
        if status.is_terminal() {
            return Err(ServiceError::ValidationError(
                "a sale can only be created as completed or pending".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();
        let sale_id = request.id.unwrap_or_else(Uuid::new_v4);
        let sale_date = request.date.unwrap_or(now);

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for sale creation");
            ServiceError::DatabaseError(e)
        })?;

        user::Entity::find_by_id(request.cashier_id)
            .one(&txn)
            .await?
            .ok_or(ServiceError::CashierNotFound(request.cashier_id))?;

        let mut stock_events = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            StockLedger::reserve(&txn, line.item_id, line.quantity).await?;
            stock_events.push(Event::StockDecremented {
                item_id: line.item_id,
                quantity: line.quantity,
                sale_id,
            });
        }

        let (subtotal, total) =
            resolve_sale_totals(request.subtotal, request.tax, request.total, &request.lines);

        let sale_model = sale::ActiveModel {
            id: Set(sale_id),
            date: Set(sale_date),
            subtotal: Set(subtotal),
            tax: Set(request.tax),
            total: Set(total),
            payment_method: Set(request.payment_method.clone()),
            status: Set(status.as_str().to_string()),
            customer_name: Set(request.customer_name.clone()),
            cashier_id: Set(request.cashier_id),
        }
        .insert(&txn)
        .await?;

        let mut line_responses = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let inserted = sale_line::ActiveModel {
                id: Set(line.id.unwrap_or_else(Uuid::new_v4)),
                sale_id: Set(sale_id),
                item_id: Set(line.item_id),
                quantity: Set(line.quantity),
                price: Set(line.price),
                total: Set(line.total),
            }
            .insert(&txn)
            .await?;

            line_responses.push(SaleLineResponse {
                id: inserted.id,
                item_id: inserted.item_id,
                quantity: inserted.quantity,
                price: inserted.price,
                total: inserted.total,
            });
        }

        let mut payment_due_event = None;
        if status == SaleStatus::Pending {
            let due_date = now + Duration::days(self.payment_due_grace_days);
            let due = payment_due::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                amount: Set(total),
                due_date: Set(due_date),
                status: Set(PaymentDueStatus::Pending.as_str().to_string()),
            }
            .insert(&txn)
            .await?;

            payment_due_event = Some(Event::PaymentDueCreated {
                payment_due_id: due.id,
                sale_id,
                amount: due.amount,
                due_date: due.due_date,
            });
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "Failed to commit sale creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(sale_id = %sale_id, status = %status.as_str(), total = %total, "Sale created");

        let sale_event = match status {
            SaleStatus::Pending => Event::SalePending(sale_id),
            _ => Event::SaleCompleted(sale_id),
        };
        self.emit(sale_event).await;
        for event in stock_events {
            self.emit(event).await;
        }
        if let Some(event) = payment_due_event {
            self.emit(event).await;
        }

        Ok(self.to_response(sale_model, line_responses))
    }

    /// Retrieves a sale with its lines
    #[instrument(skip(self), fields(sale_id = %sale_id))]
    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        let db = &*self.db_pool;

        let sale = sale::Entity::find_by_id(sale_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))?;

        let lines = sale_line::Entity::find()
            .filter(sale_line::Column::SaleId.eq(sale_id))
            .all(db)
            .await?;

        let line_responses = lines
            .into_iter()
            .map(|l| SaleLineResponse {
                id: l.id,
                item_id: l.item_id,
                quantity: l.quantity,
                price: l.price,
                total: l.total,
            })
            .collect();

        Ok(self.to_response(sale, line_responses))
    }

    /// Lists sales newest first, optionally bounded to a date range
    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        page: u64,
        per_page: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<SaleListResponse, ServiceError> {
        use sea_orm::PaginatorTrait;

        let db = &*self.db_pool;

        let mut query = sale::Entity::find().order_by_desc(sale::Column::Date);
        if let Some(from) = from {
            query = query.filter(sale::Column::Date.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(sale::Column::Date.lte(to));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(SaleListResponse {
            sales: sales.into_iter().map(Self::to_summary).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Refunds a sale, restoring the stock its lines consumed
    #[instrument(skip(self), fields(sale_id = %sale_id))]
    pub async fn refund_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        self.reverse_sale(sale_id, SaleStatus::Refunded).await
    }

    /// Voids a sale, restoring the stock its lines consumed
    #[instrument(skip(self), fields(sale_id = %sale_id))]
    pub async fn void_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        self.reverse_sale(sale_id, SaleStatus::Voided).await
    }

    /// Shared reversal path for refund and void.
    ///
    /// A sale that does not exist and one that was already refunded or
    /// voided are indistinguishable to the caller: both come back as
    /// not-found. Stock restoration and the status flip share one
    /// transaction. Any payment due opened for the sale is left alone.
    async fn reverse_sale(
        &self,
        sale_id: Uuid,
        target: SaleStatus,
    ) -> Result<SaleResponse, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "Failed to start transaction for sale reversal");
            ServiceError::DatabaseError(e)
        })?;

        let sale = sale::Entity::find_by_id(sale_id)
            .one(&txn)
            .await?
            .filter(|s| {
                SaleStatus::parse(&s.status).map_or(true, |status| !status.is_terminal())
            })
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Sale {} not found or already reversed", sale_id))
            })?;

        let lines = sale_line::Entity::find()
            .filter(sale_line::Column::SaleId.eq(sale_id))
            .all(&txn)
            .await?;

        let mut stock_events = Vec::with_capacity(lines.len());
        for line in &lines {
            StockLedger::restore(&txn, line.item_id, line.quantity).await?;
            stock_events.push(Event::StockRestored {
                item_id: line.item_id,
                quantity: line.quantity,
                sale_id,
            });
        }

        let mut active: sale::ActiveModel = sale.into();
        active.status = Set(target.as_str().to_string());
        let updated = active.update(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, sale_id = %sale_id, "Failed to commit sale reversal transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(sale_id = %sale_id, status = %target.as_str(), "Sale reversed");

        let sale_event = match target {
            SaleStatus::Voided => Event::SaleVoided(sale_id),
            _ => Event::SaleRefunded(sale_id),
        };
        self.emit(sale_event).await;
        for event in stock_events {
            self.emit(event).await;
        }

        let line_responses = lines
            .into_iter()
            .map(|l| SaleLineResponse {
                id: l.id,
                item_id: l.item_id,
                quantity: l.quantity,
                price: l.price,
                total: l.total,
            })
            .collect();

        Ok(self.to_response(updated, line_responses))
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send sale event");
            }
        }
    }

    fn to_response(&self, model: sale::Model, lines: Vec<SaleLineResponse>) -> SaleResponse {
        SaleResponse {
            id: model.id,
            date: model.date,
            subtotal: model.subtotal,
            tax: model.tax,
            total: model.total,
            payment_method: model.payment_method,
            status: model.status,
            customer_name: model.customer_name,
            cashier_id: model.cashier_id,
            lines,
        }
    }

    fn to_summary(model: sale::Model) -> SaleSummary {
        SaleSummary {
            id: model.id,
            date: model.date,
            subtotal: model.subtotal,
            tax: model.tax,
            total: model.total,
            payment_method: model.payment_method,
            status: model.status,
            customer_name: model.customer_name,
            cashier_id: model.cashier_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(total: Decimal) -> SaleLineRequest {
        SaleLineRequest {
            id: None,
            item_id: Uuid::new_v4(),
            quantity: dec!(1),
            price: total,
            total,
        }
    }

    #[test]
    fn zero_subtotal_derives_from_line_totals() {
        let lines = vec![line(dec!(10.50)), line(dec!(4.50))];
        let (subtotal, total) = resolve_sale_totals(dec!(0), dec!(1.20), dec!(0), &lines);
        assert_eq!(subtotal, dec!(15.00));
        assert_eq!(total, dec!(16.20));
    }

    #[test]
    fn explicit_totals_are_kept_verbatim() {
        let lines = vec![line(dec!(10))];
        let (subtotal, total) = resolve_sale_totals(dec!(99), dec!(5), dec!(50), &lines);
        assert_eq!(subtotal, dec!(99));
        assert_eq!(total, dec!(50));
    }

    #[test]
    fn zero_total_with_explicit_subtotal() {
        let lines = vec![line(dec!(10))];
        let (subtotal, total) = resolve_sale_totals(dec!(20), dec!(2), dec!(0), &lines);
        assert_eq!(subtotal, dec!(20));
        assert_eq!(total, dec!(22));
    }

    #[test]
    fn request_without_lines_is_rejected() {
        let request = CreateSaleRequest {
            id: None,
            date: None,
            subtotal: dec!(0),
            tax: dec!(0),
            total: dec!(0),
            payment_method: "cash".into(),
            status: "completed".into(),
            customer_name: None,
            cashier_id: Uuid::new_v4(),
            lines: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let mut bad = line(dec!(10));
        bad.quantity = dec!(0);
        let request = CreateSaleRequest {
            id: None,
            date: None,
            subtotal: dec!(0),
            tax: dec!(0),
            total: dec!(0),
            payment_method: "cash".into(),
            status: "completed".into(),
            customer_name: None,
            cashier_id: Uuid::new_v4(),
            lines: vec![bad],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn creation_status_is_normalized_case_insensitively() {
        assert_eq!(SaleStatus::parse(" Completed "), Some(SaleStatus::Completed));
        assert_eq!(SaleStatus::parse("PENDING"), Some(SaleStatus::Pending));
        assert_eq!(SaleStatus::parse("paid"), None);
    }
}
