//! StockKeep Core - inventory, quoting and order management
//!
//! - Products with on-hand and reserved quantities
//! - Categories and suppliers
//! - Quotes, sales orders with stock reservations, purchase orders with receiving
//! - Stock movement ledger and dashboard aggregates
//! - Pluggable key-value persistence (memory or JSON files)
//!
//! # Example
//!
//! ```rust,ignore
//! use stockkeep_core::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let keep = StockKeep::open(StockKeepConfig::new().in_memory()).await?;
//!
//! let order = keep
//!     .sales_orders()
//!     .create(NewSalesOrder {
//!         customer: Customer::named("Acme"),
//!         line_items: vec![OrderLine::new(ProductId(1), 3)],
//!         ..NewSalesOrder::default()
//!     })
//!     .await?;
//! keep.sales_orders().fulfill(order.id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod inventory;
pub mod numbering;
pub mod services;
pub mod stockkeep;
pub mod store;
pub mod types;

pub use config::{ConfigError, StockKeepConfig, StorageBackend, StorageConfig};
pub use error::{
    EntityKind, InventoryError, NotifyError, StockError, StockResult, StoreError,
};
pub use inventory::{Movement, StockBatch};
pub use services::{
    CategoryService, DashboardService, DashboardStats, ProductService, PurchaseOrderNotice,
    PurchaseOrderService, QuoteService, SalesOrderService, SupplierNotifier, SupplierService,
    TracingNotifier, TransactionService,
};
pub use stockkeep::StockKeep;
pub use store::{Db, FileStore, MemoryStore, Snapshot, Store};
pub use types::{
    Category, CategoryId, CategoryPatch, Customer, LineItem, NewCategory, NewProduct,
    NewPurchaseOrder, NewQuote, NewSalesOrder, NewSupplier, NewTransaction, OrderLine, Product,
    ProductId, ProductPatch, PurchaseLine, PurchaseLineInput, PurchaseOrder, PurchaseOrderId,
    PurchaseOrderPatch, PurchaseOrderStatus, Quote, QuoteId, QuotePatch, QuoteStatus, Receipt,
    SalesOrder, SalesOrderId, SalesOrderPatch, SalesOrderStatus, StockAdjustment, StockStatus,
    Supplier, SupplierId, SupplierPatch, Totals, Transaction, TransactionId, TransactionKind,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with StockKeep
    pub use crate::{
        Customer, NewProduct, NewPurchaseOrder, NewQuote, NewSalesOrder, OrderLine, Product,
        ProductId, PurchaseOrderStatus, QuoteStatus, Receipt, SalesOrderStatus, StockError,
        StockKeep, StockKeepConfig, StockResult,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
