//! Collection services
//!
//! Each service owns a [`Db`](crate::store::Db) handle. Mutations take the
//! database write gate for their whole load-modify-save cycle.

pub mod categories;
pub mod dashboard;
pub mod notify;
pub mod products;
pub mod purchase_orders;
pub mod quotes;
pub mod sales_orders;
pub mod suppliers;
pub mod transactions;

pub use categories::CategoryService;
pub use dashboard::{DashboardService, DashboardStats};
pub use notify::{NotifyError, PurchaseOrderNotice, SupplierNotifier, TracingNotifier};
pub use products::ProductService;
pub use purchase_orders::PurchaseOrderService;
pub use quotes::QuoteService;
pub use sales_orders::SalesOrderService;
pub use suppliers::SupplierService;
pub use transactions::TransactionService;

use crate::error::{InventoryError, StockResult};
use crate::services::products::find_product;
use crate::types::{LineItem, OrderLine, Product};

/// Price requested lines against the catalog
pub(crate) fn price_lines(products: &[Product], lines: &[OrderLine]) -> StockResult<Vec<LineItem>> {
    lines
        .iter()
        .map(|line| {
            if line.quantity == 0 {
                return Err(InventoryError::InvalidQuantity {
                    product: line.product_id,
                    quantity: 0,
                }
                .into());
            }
            let product = find_product(products, line.product_id)?;
            let unit_price = line.unit_price.unwrap_or(product.price);
            Ok(LineItem::new(line.product_id, line.quantity, unit_price))
        })
        .collect()
}
