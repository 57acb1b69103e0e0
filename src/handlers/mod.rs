pub mod common;
pub mod items;
pub mod payments;
pub mod sales;
pub mod users;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{ItemService, PaymentDueService, SaleService, UserService};

/// Container for the service layer, built once at startup and shared
/// through the application state
#[derive(Clone)]
pub struct AppServices {
    pub sales: Arc<SaleService>,
    pub payments: Arc<PaymentDueService>,
    pub items: Arc<ItemService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        payment_due_grace_days: i64,
    ) -> Self {
        let sales = Arc::new(SaleService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
            payment_due_grace_days,
        ));
        let payments = Arc::new(PaymentDueService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let items = Arc::new(ItemService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let users = Arc::new(UserService::new(db_pool, Some(event_sender)));

        Self {
            sales,
            payments,
            items,
            users,
        }
    }
}
