//! Read-only inventory overview

use crate::error::StockResult;
use crate::services::categories::CategoryService;
use crate::services::transactions::TransactionService;
use crate::store::Db;
use crate::types::{round_cents, Category, Product, PurchaseOrder, SalesOrder, StockStatus, Transaction};
use serde::{Deserialize, Serialize};

/// Snapshot of stock health and open work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    /// Sum of list price times on-hand units
    pub total_value: f64,
    /// `0 < quantity <= minStockLevel`
    pub low_stock: Vec<Product>,
    pub out_of_stock: Vec<Product>,
    /// Low stock first, then out of stock
    pub critical: Vec<Product>,
    pub reserved_units: u64,
    pub open_sales_orders: usize,
    pub open_purchase_orders: usize,
    /// Most recently updated products
    pub recent_products: Vec<Product>,
    pub recent_transactions: Vec<Transaction>,
    pub categories: Vec<Category>,
}

impl DashboardStats {
    /// True when any product needs restocking
    #[inline]
    #[must_use]
    pub fn needs_attention(&self) -> bool {
        !self.critical.is_empty()
    }
}

/// Builds [`DashboardStats`]
#[derive(Debug, Clone)]
pub struct DashboardService {
    db: Db,
    recent: usize,
}

impl DashboardService {
    /// Create service over `db` listing `recent` rows per recent list
    #[inline]
    #[must_use]
    pub fn new(db: Db, recent: usize) -> Self {
        Self { db, recent }
    }

    /// Compute the overview
    pub async fn stats(&self) -> StockResult<DashboardStats> {
        let products: Vec<Product> = self.db.load().await?;
        let sales_orders: Vec<SalesOrder> = self.db.load().await?;
        let purchase_orders: Vec<PurchaseOrder> = self.db.load().await?;
        let categories = CategoryService::new(self.db.clone()).get_all().await?;
        let recent_transactions = TransactionService::new(self.db.clone())
            .recent(self.recent)
            .await?;

        let with_status = |status: StockStatus| -> Vec<Product> {
            products
                .iter()
                .filter(|p| p.stock_status() == status)
                .cloned()
                .collect()
        };
        let low_stock = with_status(StockStatus::LowStock);
        let out_of_stock = with_status(StockStatus::OutOfStock);
        let critical = low_stock.iter().chain(&out_of_stock).cloned().collect();

        let mut recent_products = products.clone();
        recent_products.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        recent_products.truncate(self.recent);

        let stats = DashboardStats {
            total_products: products.len(),
            total_value: round_cents(products.iter().map(Product::stock_value).sum()),
            low_stock,
            out_of_stock,
            critical,
            reserved_units: products.iter().map(|p| u64::from(p.reserved_quantity)).sum(),
            open_sales_orders: sales_orders.iter().filter(|o| o.status.is_open()).count(),
            open_purchase_orders: purchase_orders
                .iter()
                .filter(|o| !o.status.is_terminal())
                .count(),
            recent_products,
            recent_transactions,
            categories,
        };
        tracing::debug!(
            products = stats.total_products,
            critical = stats.critical.len(),
            "computed dashboard"
        );
        Ok(stats)
    }
}
