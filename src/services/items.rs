use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::item;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "sku is required"))]
    pub sku: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub stock: Decimal,
    #[serde(default)]
    pub min_stock_level: Decimal,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<Decimal>,
    #[serde(default)]
    pub min_stock_level: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub stock: Decimal,
    pub min_stock_level: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemListResponse {
    pub items: Vec<ItemResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for the item catalog
#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ItemService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a catalog item; SKUs must be unique
    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_item(
        &self,
        request: CreateItemRequest,
    ) -> Result<ItemResponse, ServiceError> {
        request.validate()?;

        if request.price < Decimal::ZERO
            || request.cost < Decimal::ZERO
            || request.stock < Decimal::ZERO
            || request.min_stock_level < Decimal::ZERO
        {
            return Err(ServiceError::ValidationError(
                "item amounts must not be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let existing = item::Entity::find()
            .filter(item::Column::Sku.eq(request.sku.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "an item with SKU '{}' already exists",
                request.sku
            )));
        }

        let now = Utc::now();
        let model = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            sku: Set(request.sku),
            price: Set(request.price),
            cost: Set(request.cost),
            stock: Set(request.stock),
            min_stock_level: Set(request.min_stock_level),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(item_id = %model.id, sku = %model.sku, "Item created");
        self.emit(Event::ItemCreated(model.id)).await;

        Ok(Self::to_response(model))
    }

    /// Retrieves an item by ID
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<ItemResponse, ServiceError> {
        let db = &*self.db_pool;

        let model = item::Entity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        Ok(Self::to_response(model))
    }

    /// Lists active items with pagination
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ItemListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = item::Entity::find()
            .filter(item::Column::IsActive.eq(true))
            .order_by_asc(item::Column::Name)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(ItemListResponse {
            items: items.into_iter().map(Self::to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Lists active items whose stock has fallen to or below their
    /// minimum stock level
    #[instrument(skip(self))]
    pub async fn list_low_stock(&self) -> Result<Vec<ItemResponse>, ServiceError> {
        let db = &*self.db_pool;

        let items = item::Entity::find()
            .filter(item::Column::IsActive.eq(true))
            .filter(
                Expr::col(item::Column::Stock).lte(Expr::col(item::Column::MinStockLevel)),
            )
            .order_by_asc(item::Column::Name)
            .all(db)
            .await?;

        Ok(items.into_iter().map(Self::to_response).collect())
    }

    /// Applies partial updates to an item
    #[instrument(skip(self, request), fields(item_id = %item_id))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        request: UpdateItemRequest,
    ) -> Result<ItemResponse, ServiceError> {
        let db = &*self.db_pool;

        let model = item::Entity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let mut active: item::ActiveModel = model.into();
        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "name must not be empty".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(cost) = request.cost {
            active.cost = Set(cost);
        }
        if let Some(stock) = request.stock {
            active.stock = Set(stock);
        }
        if let Some(min_stock_level) = request.min_stock_level {
            active.min_stock_level = Set(min_stock_level);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;

        info!(item_id = %item_id, "Item updated");
        self.emit(Event::ItemUpdated(item_id)).await;

        Ok(Self::to_response(updated))
    }

    /// Deactivates an item.
    ///
    /// Rows are never deleted because past sale lines reference them;
    /// the item just stops showing up in listings.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let model = item::Entity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let mut active: item::ActiveModel = model.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        info!(item_id = %item_id, "Item deactivated");
        self.emit(Event::ItemDeleted(item_id)).await;

        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send item event");
            }
        }
    }

    fn to_response(model: item::Model) -> ItemResponse {
        ItemResponse {
            id: model.id,
            name: model.name,
            sku: model.sku,
            price: model.price,
            cost: model.cost,
            stock: model.stock,
            min_stock_level: model.min_stock_level,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
