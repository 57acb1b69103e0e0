use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::payment_due;
use crate::entities::payment_due::PaymentDueStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentDueResponse {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: String,
}

/// Request payload for settling a payment due
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MarkPaidRequest {
    /// When the payment was received; defaults to now
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
}

/// Service for tracking outstanding payments on pending sales
#[derive(Clone)]
pub struct PaymentDueService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentDueService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Lists payment dues, optionally narrowed to one status.
    ///
    /// The unfiltered listing shows the latest due date first; a filtered
    /// listing shows the most urgent first, like the pending view.
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        status: Option<PaymentDueStatus>,
    ) -> Result<Vec<PaymentDueResponse>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = payment_due::Entity::find();
        query = match status {
            Some(status) => query
                .filter(payment_due::Column::Status.eq(status.as_str()))
                .order_by_asc(payment_due::Column::DueDate),
            None => query.order_by_desc(payment_due::Column::DueDate),
        };
        let dues = query.all(db).await?;

        Ok(dues.into_iter().map(Self::to_response).collect())
    }

    /// Lists unpaid dues, most urgent first
    #[instrument(skip(self))]
    pub async fn list_pending(&self) -> Result<Vec<PaymentDueResponse>, ServiceError> {
        let db = &*self.db_pool;

        let dues = payment_due::Entity::find()
            .filter(payment_due::Column::Status.eq(PaymentDueStatus::Pending.as_str()))
            .order_by_asc(payment_due::Column::DueDate)
            .all(db)
            .await?;

        Ok(dues.into_iter().map(Self::to_response).collect())
    }

    /// Lists unpaid dues whose due date has already passed.
    ///
    /// Overdue is derived at query time from status and due date; no flag
    /// is stored for it. The cutoff is the start of today (UTC), so a due
    /// that falls due later today is not overdue yet.
    #[instrument(skip(self))]
    pub async fn list_overdue(&self) -> Result<Vec<PaymentDueResponse>, ServiceError> {
        let db = &*self.db_pool;
        let cutoff = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();

        let dues = payment_due::Entity::find()
            .filter(payment_due::Column::Status.eq(PaymentDueStatus::Pending.as_str()))
            .filter(payment_due::Column::DueDate.lt(cutoff))
            .order_by_asc(payment_due::Column::DueDate)
            .all(db)
            .await?;

        Ok(dues.into_iter().map(Self::to_response).collect())
    }

    /// Retrieves a single payment due
    #[instrument(skip(self), fields(payment_due_id = %payment_due_id))]
    pub async fn get(&self, payment_due_id: Uuid) -> Result<PaymentDueResponse, ServiceError> {
        let db = &*self.db_pool;

        let due = payment_due::Entity::find_by_id(payment_due_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Payment due {} not found", payment_due_id))
            })?;

        Ok(Self::to_response(due))
    }

    /// Settles a payment due.
    ///
    /// When a payment date is supplied it overwrites the due date, so
    /// after settlement the row records when the money actually arrived.
    /// Without one the due date stays as it was.
    #[instrument(skip(self, request), fields(payment_due_id = %payment_due_id))]
    pub async fn mark_paid(
        &self,
        payment_due_id: Uuid,
        request: MarkPaidRequest,
    ) -> Result<PaymentDueResponse, ServiceError> {
        let db = &*self.db_pool;
        let payment_date = request.payment_date.unwrap_or_else(Utc::now);

        let due = payment_due::Entity::find_by_id(payment_due_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Payment due {} not found", payment_due_id))
            })?;

        let mut active: payment_due::ActiveModel = due.into();
        active.status = Set(PaymentDueStatus::Paid.as_str().to_string());
        if let Some(supplied) = request.payment_date {
            active.due_date = Set(supplied);
        }
        let updated = active.update(db).await?;

        info!(payment_due_id = %payment_due_id, payment_date = %payment_date, "Payment due settled");

        if let Some(sender) = &self.event_sender {
            let event = Event::PaymentDueSettled {
                payment_due_id,
                payment_date,
            };
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send payment settled event");
            }
        }

        Ok(Self::to_response(updated))
    }

    fn to_response(model: payment_due::Model) -> PaymentDueResponse {
        PaymentDueResponse {
            id: model.id,
            sale_id: model.sale_id,
            amount: model.amount,
            due_date: model.due_date,
            status: model.status,
        }
    }
}
