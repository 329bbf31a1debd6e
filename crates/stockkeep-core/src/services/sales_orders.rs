//! Sales orders and their stock reservations
//!
//! An order holds a reservation for each line while it is open (Pending or
//! Processing). Cancelling or deleting an open order releases it; fulfilling
//! the order ships the units and consumes the reservation. Every change to
//! product stock and to the order list is written in one
//! [`Changeset`](crate::store::Changeset), so a failed write restores the
//! products it already touched.

use crate::error::{EntityKind, StockError, StockResult};
use crate::inventory::StockBatch;
use crate::numbering;
use crate::services::price_lines;
use crate::services::transactions::stage_movements;
use crate::store::{next_id, Db};
use crate::types::{
    NewSalesOrder, OrderLine, Product, Quote, QuoteId, QuoteStatus, SalesOrder, SalesOrderId,
    SalesOrderPatch, SalesOrderStatus, Totals, Transaction, TransactionKind,
};
use chrono::{DateTime, Utc};

fn find_order(orders: &mut [SalesOrder], id: SalesOrderId) -> StockResult<&mut SalesOrder> {
    orders
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| StockError::not_found(EntityKind::SalesOrder, id))
}

/// Order lifecycle with reservation bookkeeping
#[derive(Debug, Clone)]
pub struct SalesOrderService {
    db: Db,
    tax_rate: f64,
}

impl SalesOrderService {
    /// Create service over `db`
    #[inline]
    #[must_use]
    pub fn new(db: Db, tax_rate: f64) -> Self {
        Self { db, tax_rate }
    }

    /// All orders
    pub async fn get_all(&self) -> StockResult<Vec<SalesOrder>> {
        Ok(self.db.load().await?)
    }

    /// One order
    pub async fn get(&self, id: SalesOrderId) -> StockResult<SalesOrder> {
        let orders: Vec<SalesOrder> = self.db.load().await?;
        orders
            .into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::SalesOrder, id))
    }

    /// Reserve stock and append a new order, in memory only
    fn place(
        &self,
        products: &mut Vec<Product>,
        orders: &mut Vec<SalesOrder>,
        input: NewSalesOrder,
        totals: Option<Totals>,
        now: DateTime<Utc>,
    ) -> StockResult<SalesOrder> {
        let status = input.status.unwrap_or(SalesOrderStatus::Pending);
        if !status.is_open() {
            return Err(StockError::InvalidInput(format!(
                "new orders must be Pending or Processing, not {status}"
            )));
        }
        let line_items = price_lines(products, &input.line_items)?;

        let mut batch = StockBatch::new(products, now);
        batch.reserve_lines(&line_items)?;
        batch.commit();

        let order = SalesOrder {
            id: next_id(orders)?,
            order_number: numbering::sales_order_number(now),
            customer: input.customer,
            totals: totals.unwrap_or_else(|| Totals::compute(&line_items, self.tax_rate)),
            line_items,
            status,
            quote_id: input.quote_id,
            notes: input.notes,
            fulfilled_at: None,
            created_at: now,
            updated_at: now,
        };
        orders.push(order.clone());
        Ok(order)
    }

    /// Create an order, reserving every line or none
    pub async fn create(&self, input: NewSalesOrder) -> StockResult<SalesOrder> {
        self.create_with_totals(input, None).await
    }

    async fn create_with_totals(
        &self,
        input: NewSalesOrder,
        totals: Option<Totals>,
    ) -> StockResult<SalesOrder> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let mut orders: Vec<SalesOrder> = self.db.load().await?;
        let order = self.place(&mut products, &mut orders, input, totals, Utc::now())?;
        self.db
            .changeset()
            .put(&products)?
            .put(&orders)?
            .commit()
            .await?;
        tracing::info!(
            id = %order.id,
            number = %order.order_number,
            lines = order.line_items.len(),
            "created sales order"
        );
        Ok(order)
    }

    /// Create an order from a quote's lines, keeping the quoted totals
    pub async fn create_from_quote(&self, quote_id: QuoteId, quote: &Quote) -> StockResult<SalesOrder> {
        let input = order_from_quote(quote_id, quote);
        self.create_with_totals(input, Some(quote.totals)).await
    }

    /// Turn an accepted quote into an order and mark the quote converted
    pub async fn convert_quote(&self, quote_id: QuoteId) -> StockResult<SalesOrder> {
        let _guard = self.db.write().await;
        let mut quotes: Vec<Quote> = self.db.load().await?;
        let quote = quotes
            .iter_mut()
            .find(|q| q.id == quote_id)
            .ok_or_else(|| StockError::not_found(EntityKind::Quote, quote_id))?;
        if quote.status != QuoteStatus::Accepted {
            return Err(StockError::invalid_transition(
                EntityKind::Quote,
                quote.status,
                QuoteStatus::Converted,
            ));
        }

        let now = Utc::now();
        let mut products: Vec<Product> = self.db.load().await?;
        let mut orders: Vec<SalesOrder> = self.db.load().await?;
        let input = order_from_quote(quote_id, quote);
        let order = self.place(&mut products, &mut orders, input, Some(quote.totals), now)?;
        quote.status = QuoteStatus::Converted;
        quote.updated_at = now;

        self.db
            .changeset()
            .put(&products)?
            .put(&orders)?
            .put(&quotes)?
            .commit()
            .await?;
        tracing::info!(quote = %quote_id, order = %order.id, "converted quote to sales order");
        Ok(order)
    }

    /// Edit an order; new lines swap the reservation atomically
    pub async fn update(&self, id: SalesOrderId, patch: SalesOrderPatch) -> StockResult<SalesOrder> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let mut orders: Vec<SalesOrder> = self.db.load().await?;
        let now = Utc::now();
        let order = find_order(&mut orders, id)?;

        if let Some(lines) = patch.line_items {
            if !order.status.is_open() {
                return Err(StockError::Conflict(format!(
                    "Cannot change line items of a {} order",
                    order.status
                )));
            }
            let line_items = price_lines(&products, &lines)?;
            let mut batch = StockBatch::new(&mut products, now);
            batch.release_lines(&order.line_items);
            if let Err(err) = batch.reserve_lines(&line_items) {
                tracing::warn!(%err, order = %id, "new lines do not fit; keeping old reservation");
                return Err(err.into());
            }
            batch.commit();
            order.totals = Totals::compute(&line_items, self.tax_rate);
            order.line_items = line_items;
        }
        if let Some(customer) = patch.customer {
            order.customer = customer;
        }
        if let Some(notes) = patch.notes {
            order.notes = notes;
        }
        order.updated_at = now;
        let updated = order.clone();

        self.db
            .changeset()
            .put(&products)?
            .put(&orders)?
            .commit()
            .await?;
        tracing::info!(id = %id, "updated sales order");
        Ok(updated)
    }

    /// Remove an order, releasing its reservation if still open
    pub async fn delete(&self, id: SalesOrderId) -> StockResult<()> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let mut orders: Vec<SalesOrder> = self.db.load().await?;
        let order = find_order(&mut orders, id)?;

        if order.status.is_open() {
            let mut batch = StockBatch::new(&mut products, Utc::now());
            batch.release_lines(&order.line_items);
            batch.commit();
        }
        orders.retain(|o| o.id != id);

        self.db
            .changeset()
            .put(&products)?
            .put(&orders)?
            .commit()
            .await?;
        tracing::info!(id = %id, "deleted sales order");
        Ok(())
    }

    /// Change status
    ///
    /// Cancelling releases the reservation, `Fulfilled` ships the order.
    /// Fulfilled and cancelled orders are final.
    pub async fn update_status(
        &self,
        id: SalesOrderId,
        status: SalesOrderStatus,
    ) -> StockResult<SalesOrder> {
        if status == SalesOrderStatus::Fulfilled {
            return self.fulfill(id).await;
        }

        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let mut orders: Vec<SalesOrder> = self.db.load().await?;
        let now = Utc::now();
        let order = find_order(&mut orders, id)?;

        if !order.status.is_open() {
            return Err(StockError::invalid_transition(
                EntityKind::SalesOrder,
                order.status,
                status,
            ));
        }
        if status == SalesOrderStatus::Cancelled {
            let mut batch = StockBatch::new(&mut products, now);
            batch.release_lines(&order.line_items);
            batch.commit();
        }
        order.status = status;
        order.updated_at = now;
        let updated = order.clone();

        self.db
            .changeset()
            .put(&products)?
            .put(&orders)?
            .commit()
            .await?;
        tracing::info!(id = %id, %status, "sales order status changed");
        Ok(updated)
    }

    /// Ship every line, consume the reservation and close the order
    pub async fn fulfill(&self, id: SalesOrderId) -> StockResult<SalesOrder> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let mut orders: Vec<SalesOrder> = self.db.load().await?;
        let mut ledger: Vec<Transaction> = self.db.load().await?;
        let now = Utc::now();
        let order = find_order(&mut orders, id)?;

        match order.status {
            SalesOrderStatus::Fulfilled => {
                return Err(StockError::Conflict("Order already fulfilled".to_string()))
            }
            SalesOrderStatus::Cancelled => {
                return Err(StockError::Conflict(
                    "Cannot fulfill cancelled order".to_string(),
                ))
            }
            SalesOrderStatus::Pending | SalesOrderStatus::Processing => {}
        }

        let mut batch = StockBatch::new(&mut products, now);
        batch.fulfill_lines(&order.line_items)?;
        let movements = batch.commit();
        stage_movements(
            &mut ledger,
            &movements,
            TransactionKind::StockOut,
            Some(order.order_number.as_str()),
            "sales order fulfilled",
            now,
        )?;

        order.status = SalesOrderStatus::Fulfilled;
        order.fulfilled_at = Some(now);
        order.updated_at = now;
        let updated = order.clone();

        self.db
            .changeset()
            .put(&products)?
            .put(&orders)?
            .put(&ledger)?
            .commit()
            .await?;
        tracing::info!(id = %id, number = %updated.order_number, "fulfilled sales order");
        Ok(updated)
    }

    /// Orders in one status
    pub async fn by_status(&self, status: SalesOrderStatus) -> StockResult<Vec<SalesOrder>> {
        let mut orders: Vec<SalesOrder> = self.db.load().await?;
        orders.retain(|o| o.status == status);
        Ok(orders)
    }

    /// Orders whose customer name contains `name`, ignoring case
    pub async fn by_customer(&self, name: &str) -> StockResult<Vec<SalesOrder>> {
        let mut orders: Vec<SalesOrder> = self.db.load().await?;
        orders.retain(|o| o.customer.name_matches(name));
        Ok(orders)
    }
}

fn order_from_quote(quote_id: QuoteId, quote: &Quote) -> NewSalesOrder {
    NewSalesOrder {
        customer: quote.customer.clone(),
        line_items: quote.line_items.iter().copied().map(OrderLine::from).collect(),
        status: Some(SalesOrderStatus::Pending),
        quote_id: Some(quote_id),
        notes: quote.notes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InventoryError;
    use crate::types::{CategoryId, Customer, ProductId};

    fn product(id: u32, quantity: u32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId(id),
            sku: format!("P-{id}"),
            name: format!("Product {id}"),
            category: CategoryId(1),
            supplier: None,
            quantity,
            reserved_quantity: 0,
            min_stock_level: 0,
            price: 10.0,
            cost: 4.0,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup(stock: &[(u32, u32)]) -> (Db, SalesOrderService) {
        let db = Db::in_memory();
        let products: Vec<Product> = stock.iter().map(|(id, qty)| product(*id, *qty)).collect();
        db.save(&products).await.unwrap();
        (db.clone(), SalesOrderService::new(db, 0.09))
    }

    fn order(lines: &[(u32, u32)]) -> NewSalesOrder {
        NewSalesOrder {
            customer: Customer::named("Acme"),
            line_items: lines
                .iter()
                .map(|(id, qty)| OrderLine::new(ProductId(*id), *qty))
                .collect(),
            ..NewSalesOrder::default()
        }
    }

    async fn reserved(db: &Db) -> Vec<(u32, u32, u32)> {
        let products: Vec<Product> = db.load().await.unwrap();
        products
            .iter()
            .map(|p| (p.id.0, p.quantity, p.reserved_quantity))
            .collect()
    }

    #[tokio::test]
    async fn create_reserves_and_prices() {
        let (db, service) = setup(&[(1, 10), (2, 5)]).await;
        let created = service.create(order(&[(1, 3), (2, 5)])).await.unwrap();
        assert_eq!(created.status, SalesOrderStatus::Pending);
        assert!(created.order_number.starts_with("SO-"));
        assert_eq!(created.totals.subtotal, 80.0);
        assert_eq!(created.totals.tax, 7.2);
        assert_eq!(reserved(&db).await, vec![(1, 10, 3), (2, 5, 5)]);
    }

    #[tokio::test]
    async fn failed_create_leaves_no_partial_reservation() {
        let (db, service) = setup(&[(1, 10), (2, 1)]).await;
        let err = service.create(order(&[(1, 3), (2, 2)])).await.unwrap_err();
        assert!(matches!(
            err,
            StockError::Inventory(InventoryError::InsufficientStock { .. })
        ));
        assert_eq!(reserved(&db).await, vec![(1, 10, 0), (2, 1, 0)]);
        assert!(service.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_swaps_reservation() {
        let (db, service) = setup(&[(1, 10), (2, 5)]).await;
        let created = service.create(order(&[(1, 8)])).await.unwrap();

        let patch = SalesOrderPatch {
            line_items: Some(vec![OrderLine::new(ProductId(1), 10), OrderLine::new(ProductId(2), 1)]),
            ..SalesOrderPatch::default()
        };
        let updated = service.update(created.id, patch).await.unwrap();
        assert_eq!(updated.line_items.len(), 2);
        assert_eq!(reserved(&db).await, vec![(1, 10, 10), (2, 5, 1)]);
    }

    #[tokio::test]
    async fn failed_update_restores_old_reservation() {
        let (db, service) = setup(&[(1, 10), (2, 5)]).await;
        let created = service.create(order(&[(1, 4)])).await.unwrap();

        let patch = SalesOrderPatch {
            line_items: Some(vec![OrderLine::new(ProductId(1), 2), OrderLine::new(ProductId(2), 6)]),
            ..SalesOrderPatch::default()
        };
        assert!(service.update(created.id, patch).await.is_err());
        assert_eq!(reserved(&db).await, vec![(1, 10, 4), (2, 5, 0)]);
        assert_eq!(service.get(created.id).await.unwrap().line_items[0].quantity, 4);
    }

    #[tokio::test]
    async fn cancel_releases_and_is_final() {
        let (db, service) = setup(&[(1, 10)]).await;
        let created = service.create(order(&[(1, 6)])).await.unwrap();

        let cancelled = service
            .update_status(created.id, SalesOrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, SalesOrderStatus::Cancelled);
        assert_eq!(reserved(&db).await, vec![(1, 10, 0)]);

        let err = service
            .update_status(created.id, SalesOrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::InvalidTransition { .. }));
        let err = service.fulfill(created.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot fulfill cancelled order");
    }

    #[tokio::test]
    async fn fulfill_ships_stock_and_records_ledger() {
        let (db, service) = setup(&[(1, 10), (2, 5)]).await;
        let created = service.create(order(&[(1, 4), (2, 5)])).await.unwrap();

        let shipped = service.fulfill(created.id).await.unwrap();
        assert_eq!(shipped.status, SalesOrderStatus::Fulfilled);
        assert!(shipped.fulfilled_at.is_some());
        assert_eq!(reserved(&db).await, vec![(1, 6, 0), (2, 0, 0)]);

        let ledger: Vec<Transaction> = db.load().await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.iter().all(|t| t.kind == TransactionKind::StockOut));
        assert_eq!(ledger[0].reference.as_deref(), Some(created.order_number.as_str()));

        let err = service.fulfill(created.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Order already fulfilled");
    }

    #[tokio::test]
    async fn status_fulfilled_routes_through_fulfill() {
        let (db, service) = setup(&[(1, 3)]).await;
        let created = service.create(order(&[(1, 3)])).await.unwrap();
        service
            .update_status(created.id, SalesOrderStatus::Processing)
            .await
            .unwrap();
        service
            .update_status(created.id, SalesOrderStatus::Fulfilled)
            .await
            .unwrap();
        assert_eq!(reserved(&db).await, vec![(1, 0, 0)]);
    }

    #[tokio::test]
    async fn delete_open_order_releases() {
        let (db, service) = setup(&[(1, 3)]).await;
        let created = service.create(order(&[(1, 2)])).await.unwrap();
        service.delete(created.id).await.unwrap();
        assert_eq!(reserved(&db).await, vec![(1, 3, 0)]);
        assert!(service.delete(created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_fulfilled_order_keeps_stock() {
        let (db, service) = setup(&[(1, 3)]).await;
        let created = service.create(order(&[(1, 2)])).await.unwrap();
        service.fulfill(created.id).await.unwrap();
        service.delete(created.id).await.unwrap();
        assert_eq!(reserved(&db).await, vec![(1, 1, 0)]);
    }

    #[tokio::test]
    async fn create_rejects_closed_status() {
        let (_, service) = setup(&[(1, 3)]).await;
        let mut input = order(&[(1, 1)]);
        input.status = Some(SalesOrderStatus::Fulfilled);
        assert!(matches!(
            service.create(input).await.unwrap_err(),
            StockError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn customer_search_ignores_case() {
        let (_, service) = setup(&[(1, 10)]).await;
        service.create(order(&[(1, 1)])).await.unwrap();
        assert_eq!(service.by_customer("ACM").await.unwrap().len(), 1);
        assert!(service.by_customer("globex").await.unwrap().is_empty());
        assert_eq!(
            service.by_status(SalesOrderStatus::Pending).await.unwrap().len(),
            1
        );
    }
}
