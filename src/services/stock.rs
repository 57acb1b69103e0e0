use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::item;
use crate::errors::ServiceError;

/// Stock movements executed inside a caller-owned transaction.
///
/// Decrements are guarded at the database level: the UPDATE only lands
/// when the row still holds enough stock, so two concurrent sales of the
/// last units cannot both succeed.
pub struct StockLedger;

impl StockLedger {
    /// Atomically decrements an item's stock by `quantity` and returns
    /// the stock remaining after the decrement.
    ///
    /// Fails with `ItemNotFound` when the item does not exist and with
    /// `InsufficientStock` when the guarded update matches no row.
    pub async fn reserve<C: ConnectionTrait>(
        conn: &C,
        item_id: Uuid,
        quantity: Decimal,
    ) -> Result<Decimal, ServiceError> {
        let item = item::Entity::find_by_id(item_id)
            .one(conn)
            .await?
            .ok_or(ServiceError::ItemNotFound(item_id))?;

        let result = item::Entity::update_many()
            .col_expr(
                item::Column::Stock,
                Expr::col(item::Column::Stock).sub(quantity),
            )
            .col_expr(item::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(item::Column::Id.eq(item_id))
            .filter(item::Column::Stock.gte(quantity))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            warn!(
                item_id = %item_id,
                available = %item.stock,
                requested = %quantity,
                "Stock reservation rejected"
            );
            return Err(ServiceError::InsufficientStock {
                name: item.name,
                available: item.stock,
                requested: quantity,
            });
        }

        // Re-read under the transaction's row lock; the pre-update value
        // may be stale by the time the guarded update lands.
        let updated = item::Entity::find_by_id(item_id)
            .one(conn)
            .await?
            .ok_or(ServiceError::ItemNotFound(item_id))?;

        debug!(item_id = %item_id, quantity = %quantity, remaining = %updated.stock, "Stock reserved");
        Ok(updated.stock)
    }

    /// Adds `quantity` back onto an item's stock.
    ///
    /// Used when reversing a sale. The add is unconditional; an item
    /// deleted since the sale simply matches no row.
    pub async fn restore<C: ConnectionTrait>(
        conn: &C,
        item_id: Uuid,
        quantity: Decimal,
    ) -> Result<(), ServiceError> {
        let result = item::Entity::update_many()
            .col_expr(
                item::Column::Stock,
                Expr::col(item::Column::Stock).add(quantity),
            )
            .col_expr(item::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(item::Column::Id.eq(item_id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            warn!(item_id = %item_id, "Stock restore matched no item row");
        } else {
            debug!(item_id = %item_id, quantity = %quantity, "Stock restored");
        }

        Ok(())
    }
}
