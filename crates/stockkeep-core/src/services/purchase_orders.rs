//! Purchase orders and goods receiving
//!
//! Received units go straight into product stock and are recorded as `in`
//! transactions. Completing an order receives everything still outstanding.
//! `completed` and `cancelled` orders are final.
//!
//! After every status change the supplier is told through the configured
//! [`SupplierNotifier`]; a failed notice is logged and the change stands.

use crate::error::{EntityKind, InventoryError, StockError, StockResult};
use crate::inventory::StockBatch;
use crate::numbering;
use crate::services::notify::{PurchaseOrderNotice, SupplierNotifier, TracingNotifier};
use crate::services::products::find_product;
use crate::services::transactions::stage_movements;
use crate::store::{next_id, Db};
use crate::types::{
    round_cents, NewPurchaseOrder, Product, PurchaseLine, PurchaseLineInput, PurchaseOrder,
    PurchaseOrderId, PurchaseOrderPatch, PurchaseOrderStatus, Receipt, Supplier, SupplierId,
    Transaction, TransactionKind,
};
use chrono::Utc;
use std::sync::Arc;

fn find_order(orders: &mut [PurchaseOrder], id: PurchaseOrderId) -> StockResult<&mut PurchaseOrder> {
    orders
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| StockError::not_found(EntityKind::PurchaseOrder, id))
}

fn check_supplier(suppliers: &[Supplier], id: SupplierId) -> StockResult<()> {
    if suppliers.iter().any(|s| s.id == id) {
        Ok(())
    } else {
        Err(StockError::not_found(EntityKind::Supplier, id))
    }
}

fn build_lines(products: &[Product], input: &[PurchaseLineInput]) -> StockResult<Vec<PurchaseLine>> {
    input
        .iter()
        .map(|line| {
            if line.quantity == 0 {
                return Err(InventoryError::InvalidQuantity {
                    product: line.product_id,
                    quantity: 0,
                }
                .into());
            }
            if !line.unit_price.is_finite() || line.unit_price < 0.0 {
                return Err(StockError::InvalidInput(format!(
                    "unit price for product {} must be a non-negative number",
                    line.product_id
                )));
            }
            find_product(products, line.product_id)?;
            Ok(PurchaseLine::new(line.product_id, line.quantity, line.unit_price))
        })
        .collect()
}

/// Spread one receipt over the open lines for its product, in line order
fn book_receipt(lines: &mut [PurchaseLine], receipt: &Receipt, po_number: &str) -> StockResult<()> {
    let matching: Vec<&mut PurchaseLine> = lines
        .iter_mut()
        .filter(|line| line.product_id == receipt.product_id)
        .collect();
    if matching.is_empty() {
        return Err(StockError::InvalidInput(format!(
            "product {} is not on purchase order {po_number}",
            receipt.product_id
        )));
    }
    let outstanding: u64 = matching.iter().map(|line| u64::from(line.outstanding())).sum();
    if u64::from(receipt.quantity) > outstanding {
        return Err(StockError::Conflict(format!(
            "received {} of product {} but only {outstanding} outstanding",
            receipt.quantity, receipt.product_id
        )));
    }

    let mut remaining = receipt.quantity;
    for line in matching {
        let take = remaining.min(line.outstanding());
        line.received_quantity += take;
        remaining -= take;
    }
    Ok(())
}

fn order_total(lines: &[PurchaseLine]) -> f64 {
    round_cents(lines.iter().map(|line| line.total).sum())
}

/// Purchase order lifecycle and receiving
#[derive(Debug, Clone)]
pub struct PurchaseOrderService {
    db: Db,
    notifier: Arc<dyn SupplierNotifier>,
}

impl PurchaseOrderService {
    /// Create service over `db` that logs supplier notices
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self::with_notifier(db, Arc::new(TracingNotifier))
    }

    /// Create service with a custom notifier
    #[must_use]
    pub fn with_notifier(db: Db, notifier: Arc<dyn SupplierNotifier>) -> Self {
        Self { db, notifier }
    }

    /// All purchase orders
    pub async fn get_all(&self) -> StockResult<Vec<PurchaseOrder>> {
        Ok(self.db.load().await?)
    }

    /// One purchase order
    pub async fn get(&self, id: PurchaseOrderId) -> StockResult<PurchaseOrder> {
        let orders: Vec<PurchaseOrder> = self.db.load().await?;
        orders
            .into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::PurchaseOrder, id))
    }

    /// Create a purchase order; the number derives from the new id
    pub async fn create(&self, input: NewPurchaseOrder) -> StockResult<PurchaseOrder> {
        let status = input.status.unwrap_or(PurchaseOrderStatus::Draft);
        if !matches!(
            status,
            PurchaseOrderStatus::Draft | PurchaseOrderStatus::Submitted | PurchaseOrderStatus::Approved
        ) {
            return Err(StockError::InvalidInput(format!(
                "new purchase orders cannot start as {status}"
            )));
        }

        let _guard = self.db.write().await;
        let suppliers: Vec<Supplier> = self.db.load().await?;
        check_supplier(&suppliers, input.supplier_id)?;
        let products: Vec<Product> = self.db.load().await?;
        let line_items = build_lines(&products, &input.line_items)?;

        let mut orders: Vec<PurchaseOrder> = self.db.load().await?;
        let now = Utc::now();
        let id = next_id(&orders)?;
        let order = PurchaseOrder {
            id,
            po_number: numbering::purchase_order_number(now, id.get()),
            supplier_id: input.supplier_id,
            order_date: input.order_date.unwrap_or_else(|| now.date_naive()),
            expected_delivery_date: input.expected_delivery_date,
            status,
            notes: input.notes,
            total: order_total(&line_items),
            line_items,
            created_at: now,
            updated_at: now,
        };
        orders.push(order.clone());
        self.db.save(&orders).await?;
        tracing::info!(id = %order.id, number = %order.po_number, "created purchase order");
        Ok(order)
    }

    /// Edit a purchase order; `Id`, `poNumber` and `createdAt` are kept
    pub async fn update(
        &self,
        id: PurchaseOrderId,
        patch: PurchaseOrderPatch,
    ) -> StockResult<PurchaseOrder> {
        let _guard = self.db.write().await;
        let mut orders: Vec<PurchaseOrder> = self.db.load().await?;
        let order = find_order(&mut orders, id)?;

        if let Some(supplier_id) = patch.supplier_id {
            let suppliers: Vec<Supplier> = self.db.load().await?;
            check_supplier(&suppliers, supplier_id)?;
            order.supplier_id = supplier_id;
        }
        if let Some(lines) = patch.line_items {
            if order.status.is_terminal() || order.has_receipts() {
                return Err(StockError::Conflict(
                    "Cannot change line items after goods have been received".to_string(),
                ));
            }
            let products: Vec<Product> = self.db.load().await?;
            order.line_items = build_lines(&products, &lines)?;
            order.total = order_total(&order.line_items);
        }
        if let Some(date) = patch.order_date {
            order.order_date = date;
        }
        if let Some(date) = patch.expected_delivery_date {
            order.expected_delivery_date = Some(date);
        }
        if let Some(notes) = patch.notes {
            order.notes = notes;
        }
        order.updated_at = Utc::now();
        let updated = order.clone();

        self.db.save(&orders).await?;
        tracing::info!(id = %id, "updated purchase order");
        Ok(updated)
    }

    /// Remove a purchase order; received stock stays on hand
    pub async fn delete(&self, id: PurchaseOrderId) -> StockResult<()> {
        let _guard = self.db.write().await;
        let mut orders: Vec<PurchaseOrder> = self.db.load().await?;
        find_order(&mut orders, id)?;
        orders.retain(|o| o.id != id);
        self.db.save(&orders).await?;
        tracing::info!(id = %id, "deleted purchase order");
        Ok(())
    }

    /// Change status and notify the supplier
    ///
    /// Moving to `completed` receives every outstanding unit.
    pub async fn update_status(
        &self,
        id: PurchaseOrderId,
        status: PurchaseOrderStatus,
    ) -> StockResult<PurchaseOrder> {
        let updated = {
            let _guard = self.db.write().await;
            let mut orders: Vec<PurchaseOrder> = self.db.load().await?;
            let mut products: Vec<Product> = self.db.load().await?;
            let mut ledger: Vec<Transaction> = self.db.load().await?;
            let now = Utc::now();
            let order = find_order(&mut orders, id)?;

            if order.status.is_terminal() {
                return Err(StockError::invalid_transition(
                    EntityKind::PurchaseOrder,
                    order.status,
                    status,
                ));
            }
            if status == PurchaseOrderStatus::PartiallyReceived && !order.has_receipts() {
                return Err(StockError::invalid_transition(
                    EntityKind::PurchaseOrder,
                    order.status,
                    status,
                ));
            }

            if status == PurchaseOrderStatus::Completed {
                let mut batch = StockBatch::new(&mut products, now);
                for line in &mut order.line_items {
                    batch.receive(line.product_id, line.outstanding())?;
                    line.received_quantity = line.quantity;
                }
                let movements = batch.commit();
                stage_movements(
                    &mut ledger,
                    &movements,
                    TransactionKind::StockIn,
                    Some(order.po_number.as_str()),
                    "purchase order completed",
                    now,
                )?;
            }
            order.status = status;
            order.updated_at = now;
            let updated = order.clone();

            self.db
                .changeset()
                .put(&products)?
                .put(&orders)?
                .put(&ledger)?
                .commit()
                .await?;
            tracing::info!(id = %id, %status, "purchase order status changed");
            updated
        };

        self.announce(&updated).await;
        Ok(updated)
    }

    /// Book received units against the order lines
    ///
    /// Each receipt must match a line and may not exceed what is still
    /// outstanding for its product. Receipts fill lines for the same product
    /// in order. The order becomes `partially_received`, or `completed` once
    /// every line is in.
    pub async fn receive(
        &self,
        id: PurchaseOrderId,
        receipts: &[Receipt],
    ) -> StockResult<PurchaseOrder> {
        if receipts.is_empty() {
            return Err(StockError::InvalidInput("no receipts given".to_string()));
        }

        let updated = {
            let _guard = self.db.write().await;
            let mut orders: Vec<PurchaseOrder> = self.db.load().await?;
            let mut products: Vec<Product> = self.db.load().await?;
            let mut ledger: Vec<Transaction> = self.db.load().await?;
            let now = Utc::now();
            let order = find_order(&mut orders, id)?;

            if order.status.is_terminal() {
                return Err(StockError::Conflict(format!(
                    "Cannot receive goods for a {} purchase order",
                    order.status
                )));
            }

            let mut lines = order.line_items.clone();
            let mut batch = StockBatch::new(&mut products, now);
            for receipt in receipts {
                if receipt.quantity == 0 {
                    return Err(InventoryError::InvalidQuantity {
                        product: receipt.product_id,
                        quantity: 0,
                    }
                    .into());
                }
                book_receipt(&mut lines, receipt, &order.po_number)?;
                batch.receive(receipt.product_id, receipt.quantity)?;
            }
            let movements = batch.commit();
            stage_movements(
                &mut ledger,
                &movements,
                TransactionKind::StockIn,
                Some(order.po_number.as_str()),
                "goods received",
                now,
            )?;

            order.line_items = lines;
            order.status = if order.fully_received() {
                PurchaseOrderStatus::Completed
            } else {
                PurchaseOrderStatus::PartiallyReceived
            };
            order.updated_at = now;
            let updated = order.clone();

            self.db
                .changeset()
                .put(&products)?
                .put(&orders)?
                .put(&ledger)?
                .commit()
                .await?;
            tracing::info!(
                id = %id,
                receipts = receipts.len(),
                status = %updated.status,
                "received goods"
            );
            updated
        };

        self.announce(&updated).await;
        Ok(updated)
    }

    /// Latest `limit` orders by creation time
    pub async fn recent(&self, limit: usize) -> StockResult<Vec<PurchaseOrder>> {
        let mut orders: Vec<PurchaseOrder> = self.db.load().await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders.truncate(limit);
        Ok(orders)
    }

    /// Orders in one status
    pub async fn by_status(&self, status: PurchaseOrderStatus) -> StockResult<Vec<PurchaseOrder>> {
        let mut orders: Vec<PurchaseOrder> = self.db.load().await?;
        orders.retain(|o| o.status == status);
        Ok(orders)
    }

    /// Orders placed with one supplier
    pub async fn by_supplier(&self, supplier: SupplierId) -> StockResult<Vec<PurchaseOrder>> {
        let mut orders: Vec<PurchaseOrder> = self.db.load().await?;
        orders.retain(|o| o.supplier_id == supplier);
        Ok(orders)
    }

    /// Send the current status to the supplier again, reporting failures
    pub async fn notify_supplier(&self, id: PurchaseOrderId) -> StockResult<()> {
        let order = self.get(id).await?;
        let suppliers: Vec<Supplier> = self.db.load().await?;
        let supplier = suppliers
            .iter()
            .find(|s| s.id == order.supplier_id)
            .ok_or_else(|| StockError::not_found(EntityKind::Supplier, order.supplier_id))?;
        let notice = PurchaseOrderNotice::for_order(&order, supplier).ok_or_else(|| {
            StockError::InvalidInput(format!("supplier {} has no email address", supplier.name))
        })?;
        self.notifier.notify(&notice).await?;
        Ok(())
    }

    async fn announce(&self, order: &PurchaseOrder) {
        let suppliers: Vec<Supplier> = match self.db.load().await {
            Ok(suppliers) => suppliers,
            Err(err) => {
                tracing::warn!(%err, po = %order.po_number, "could not load suppliers for notice");
                return;
            }
        };
        let Some(notice) = suppliers
            .iter()
            .find(|s| s.id == order.supplier_id)
            .and_then(|supplier| PurchaseOrderNotice::for_order(order, supplier))
        else {
            tracing::debug!(po = %order.po_number, "supplier has no email; skipping notice");
            return;
        };
        if let Err(err) = self.notifier.notify(&notice).await {
            tracing::warn!(%err, po = %order.po_number, "supplier notification failed");
        }
    }
}
