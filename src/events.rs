use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Events emitted by the services after state changes commit.
///
/// Delivery is best-effort: a full channel or a closed receiver never
/// fails the operation that produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Sale events
    SaleCompleted(Uuid),
    SalePending(Uuid),
    SaleRefunded(Uuid),
    SaleVoided(Uuid),

    // Stock events
    StockDecremented {
        item_id: Uuid,
        quantity: Decimal,
        sale_id: Uuid,
    },
    StockRestored {
        item_id: Uuid,
        quantity: Decimal,
        sale_id: Uuid,
    },

    // Payment due events
    PaymentDueCreated {
        payment_due_id: Uuid,
        sale_id: Uuid,
        amount: Decimal,
        due_date: DateTime<Utc>,
    },
    PaymentDueSettled {
        payment_due_id: Uuid,
        payment_date: DateTime<Utc>,
    },

    // Item events
    ItemCreated(Uuid),
    ItemUpdated(Uuid),
    ItemDeleted(Uuid),

    // User events
    UserCreated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes events off the channel and logs them.
///
/// Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::SaleCompleted(sale_id) => {
                info!(sale_id = %sale_id, "Sale completed");
            }
            Event::SalePending(sale_id) => {
                info!(sale_id = %sale_id, "Sale recorded as pending payment");
            }
            Event::SaleRefunded(sale_id) => {
                info!(sale_id = %sale_id, "Sale refunded");
            }
            Event::SaleVoided(sale_id) => {
                info!(sale_id = %sale_id, "Sale voided");
            }
            Event::StockDecremented {
                item_id,
                quantity,
                sale_id,
            } => {
                info!(item_id = %item_id, quantity = %quantity, sale_id = %sale_id, "Stock decremented");
            }
            Event::StockRestored {
                item_id,
                quantity,
                sale_id,
            } => {
                info!(item_id = %item_id, quantity = %quantity, sale_id = %sale_id, "Stock restored");
            }
            Event::PaymentDueCreated {
                payment_due_id,
                sale_id,
                amount,
                due_date,
            } => {
                info!(
                    payment_due_id = %payment_due_id,
                    sale_id = %sale_id,
                    amount = %amount,
                    due_date = %due_date,
                    "Payment due created"
                );
            }
            Event::PaymentDueSettled {
                payment_due_id,
                payment_date,
            } => {
                info!(payment_due_id = %payment_due_id, payment_date = %payment_date, "Payment due settled");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}
