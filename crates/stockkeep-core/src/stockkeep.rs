//! Entry point wiring storage, configuration and services
//!
//! - Opens the store chosen by [`StockKeepConfig`]
//! - Shares one [`Db`] (and its write gate) across every service
//! - Applies configured defaults for recent lists and low-stock queries

use crate::config::{StockKeepConfig, StorageBackend};
use crate::error::{StockError, StockResult};
use crate::services::{
    CategoryService, DashboardService, ProductService, PurchaseOrderService, QuoteService,
    SalesOrderService, SupplierNotifier, SupplierService, TracingNotifier, TransactionService,
};
use crate::store::{Db, FileStore, MemoryStore, Snapshot, Store};
use crate::types::{Product, PurchaseOrder, Transaction};
use std::sync::Arc;

/// Inventory system handle
#[derive(Debug, Clone)]
pub struct StockKeep {
    config: StockKeepConfig,
    db: Db,
    products: ProductService,
    categories: CategoryService,
    suppliers: SupplierService,
    transactions: TransactionService,
    quotes: QuoteService,
    sales_orders: SalesOrderService,
    purchase_orders: PurchaseOrderService,
    dashboard: DashboardService,
}

impl StockKeep {
    /// Open the configured store; supplier notices go to the log
    ///
    /// # Errors
    /// Invalid configuration or a data directory that cannot be created
    pub async fn open(config: StockKeepConfig) -> StockResult<Self> {
        Self::open_with_notifier(config, Arc::new(TracingNotifier)).await
    }

    /// Open the configured store with a custom supplier notifier
    ///
    /// # Errors
    /// Invalid configuration or a data directory that cannot be created
    pub async fn open_with_notifier(
        config: StockKeepConfig,
        notifier: Arc<dyn SupplierNotifier>,
    ) -> StockResult<Self> {
        config
            .validate()
            .map_err(|err| StockError::InvalidInput(err.to_string()))?;
        let store: Arc<dyn Store> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => Arc::new(FileStore::open(&config.storage.data_dir).await?),
        };
        tracing::info!(
            backend = ?config.storage.backend,
            data_dir = %config.storage.data_dir.display(),
            "opened stockkeep"
        );
        Ok(Self::from_db(config, Db::new(store), notifier))
    }

    /// In-memory instance with default settings
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_db(
            StockKeepConfig::new().in_memory(),
            Db::in_memory(),
            Arc::new(TracingNotifier),
        )
    }

    /// Build over an existing database handle
    #[must_use]
    pub fn from_db(config: StockKeepConfig, db: Db, notifier: Arc<dyn SupplierNotifier>) -> Self {
        Self {
            products: ProductService::new(db.clone()),
            categories: CategoryService::new(db.clone()),
            suppliers: SupplierService::new(db.clone()),
            transactions: TransactionService::new(db.clone()),
            quotes: QuoteService::new(db.clone(), config.tax_rate),
            sales_orders: SalesOrderService::new(db.clone(), config.tax_rate),
            purchase_orders: PurchaseOrderService::with_notifier(db.clone(), notifier),
            dashboard: DashboardService::new(db.clone(), config.dashboard_recent),
            config,
            db,
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StockKeepConfig {
        &self.config
    }

    /// Products and single-product stock operations
    #[inline]
    #[must_use]
    pub fn products(&self) -> &ProductService {
        &self.products
    }

    /// Categories
    #[inline]
    #[must_use]
    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    /// Suppliers
    #[inline]
    #[must_use]
    pub fn suppliers(&self) -> &SupplierService {
        &self.suppliers
    }

    /// Stock movement ledger
    #[inline]
    #[must_use]
    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }

    /// Quotes
    #[inline]
    #[must_use]
    pub fn quotes(&self) -> &QuoteService {
        &self.quotes
    }

    /// Sales orders
    #[inline]
    #[must_use]
    pub fn sales_orders(&self) -> &SalesOrderService {
        &self.sales_orders
    }

    /// Purchase orders
    #[inline]
    #[must_use]
    pub fn purchase_orders(&self) -> &PurchaseOrderService {
        &self.purchase_orders
    }

    /// Dashboard
    #[inline]
    #[must_use]
    pub fn dashboard(&self) -> &DashboardService {
        &self.dashboard
    }

    /// Low-stock products, falling back to the configured cutoff
    pub async fn low_stock(&self, threshold: Option<u32>) -> StockResult<Vec<Product>> {
        self.products
            .low_stock(threshold.or(self.config.low_stock_threshold))
            .await
    }

    /// Latest purchase orders, configured length
    pub async fn recent_purchase_orders(&self) -> StockResult<Vec<PurchaseOrder>> {
        self.purchase_orders
            .recent(self.config.recent_purchase_orders)
            .await
    }

    /// Latest transactions, configured length
    pub async fn recent_transactions(&self) -> StockResult<Vec<Transaction>> {
        self.transactions
            .recent(self.config.recent_transactions)
            .await
    }

    /// Every collection
    pub async fn export(&self) -> StockResult<Snapshot> {
        Ok(self.db.export().await?)
    }

    /// Replace every collection
    pub async fn import(&self, snapshot: &Snapshot) -> StockResult<()> {
        Ok(self.db.import(snapshot).await?)
    }
}
