//! Key-value persistence for collections
//!
//! Each collection is stored whole as one JSON blob under a fixed key, the
//! same shape the browser kept in local storage. Backends:
//! - [`MemoryStore`] for tests and throwaway sessions
//! - [`FileStore`] writing `<key>.json` files under a data directory
//!
//! [`Db`] bundles a store with the write gate that serializes mutations.

use crate::error::StoreError;
use crate::types::{
    Category, Product, PurchaseOrder, Quote, SalesOrder, Supplier, Transaction,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Raw blob storage
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Read a blob; `None` when the key was never written
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace a blob
    async fn save(&self, key: &str, blob: String) -> Result<(), StoreError>;
}

/// In-memory store backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<String, String>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// True when nothing has been written
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blobs.get(key).map(|entry| entry.value().clone()))
    }

    async fn save(&self, key: &str, blob: String) -> Result<(), StoreError> {
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }
}

/// Directory of JSON files, one per collection
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "opened file store");
        Ok(Self { root })
    }

    /// Data directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl Store for FileStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, key: &str, blob: String) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, blob).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// A record type stored as its own collection
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Storage key of the collection
    const KEY: &'static str;

    /// Identifier type
    type Id: Copy + Eq + From<u32> + Into<u32>;

    /// Record identifier
    fn id(&self) -> Self::Id;
}

macro_rules! record {
    ($ty:ty, $id:ty, $key:literal) => {
        impl Record for $ty {
            const KEY: &'static str = $key;
            type Id = $id;

            #[inline]
            fn id(&self) -> Self::Id {
                self.id
            }
        }
    };
}

record!(Product, crate::types::ProductId, "stockkeep_products");
record!(Category, crate::types::CategoryId, "stockkeep_categories");
record!(Supplier, crate::types::SupplierId, "stockkeep_suppliers");
record!(Transaction, crate::types::TransactionId, "stockkeep_transactions");
record!(Quote, crate::types::QuoteId, "stockkeep_quotes");
record!(SalesOrder, crate::types::SalesOrderId, "stockkeep_sales_orders");
record!(PurchaseOrder, crate::types::PurchaseOrderId, "purchaseOrders");

/// Next identifier: one past the largest in use
///
/// # Errors
/// `IdsExhausted` once the largest id is `u32::MAX`
pub fn next_id<R: Record>(rows: &[R]) -> Result<R::Id, StoreError> {
    let max = rows.iter().map(|row| row.id().into()).max().unwrap_or(0);
    max.checked_add(1)
        .map(R::Id::from)
        .ok_or_else(|| StoreError::IdsExhausted(R::KEY.to_string()))
}

/// Every collection at once, for export and import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub suppliers: Vec<Supplier>,
    pub transactions: Vec<Transaction>,
    pub quotes: Vec<Quote>,
    pub sales_orders: Vec<SalesOrder>,
    pub purchase_orders: Vec<PurchaseOrder>,
}

impl Snapshot {
    /// Reject products whose reservations exceed their on-hand count
    ///
    /// # Errors
    /// `InvalidSnapshot` naming the first offending product
    pub fn validate(&self) -> Result<(), StoreError> {
        match self
            .products
            .iter()
            .find(|p| p.reserved_quantity > p.quantity)
        {
            Some(p) => Err(StoreError::InvalidSnapshot(format!(
                "product {} reserves {} units but holds {}",
                p.id, p.reserved_quantity, p.quantity
            ))),
            None => Ok(()),
        }
    }
}

/// Store handle shared by the services
#[derive(Debug, Clone)]
pub struct Db {
    store: Arc<dyn Store>,
    gate: Arc<Mutex<()>>,
}

impl Db {
    /// Wrap a store
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// In-memory database
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Take the write gate; mutations hold it from first load to last save
    pub async fn write(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Load a whole collection; a missing key is an empty collection
    pub async fn load<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        let Some(blob) = self.store.load(R::KEY).await? else {
            return Ok(Vec::new());
        };
        let rows: Vec<R> = serde_json::from_str(&blob).map_err(|source| StoreError::Corrupt {
            key: R::KEY.to_string(),
            source,
        })?;
        tracing::debug!(key = R::KEY, rows = rows.len(), "loaded collection");
        Ok(rows)
    }

    /// Replace a whole collection
    pub async fn save<R: Record>(&self, rows: &[R]) -> Result<(), StoreError> {
        let blob = serde_json::to_string(rows).map_err(|source| StoreError::Encode {
            key: R::KEY.to_string(),
            source,
        })?;
        self.store.save(R::KEY, blob).await
    }

    /// Start a multi-collection write
    #[must_use]
    pub fn changeset(&self) -> Changeset<'_> {
        Changeset {
            db: self,
            writes: Vec::new(),
        }
    }

    /// Read every collection
    pub async fn export(&self) -> Result<Snapshot, StoreError> {
        Ok(Snapshot {
            products: self.load().await?,
            categories: self.load().await?,
            suppliers: self.load().await?,
            transactions: self.load().await?,
            quotes: self.load().await?,
            sales_orders: self.load().await?,
            purchase_orders: self.load().await?,
        })
    }

    /// Overwrite every collection with the snapshot contents
    ///
    /// Nothing is written unless every product holds at least as many units
    /// as it has reserved.
    pub async fn import(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        snapshot.validate()?;
        let _guard = self.write().await;
        self.save(&snapshot.products).await?;
        self.save(&snapshot.categories).await?;
        self.save(&snapshot.suppliers).await?;
        self.save(&snapshot.transactions).await?;
        self.save(&snapshot.quotes).await?;
        self.save(&snapshot.sales_orders).await?;
        self.save(&snapshot.purchase_orders).await?;
        tracing::info!(
            products = snapshot.products.len(),
            sales_orders = snapshot.sales_orders.len(),
            purchase_orders = snapshot.purchase_orders.len(),
            "imported snapshot"
        );
        Ok(())
    }
}

/// Ordered writes to several collections
///
/// Blobs are encoded when staged. [`Changeset::commit`] writes them in
/// order; if a write fails, collections already written are restored to
/// their previous contents before the error is returned.
#[derive(Debug)]
pub struct Changeset<'a> {
    db: &'a Db,
    writes: Vec<(&'static str, String)>,
}

impl Changeset<'_> {
    /// Stage a collection
    ///
    /// # Errors
    /// `Encode` if the rows do not serialize
    pub fn put<R: Record>(mut self, rows: &[R]) -> Result<Self, StoreError> {
        let blob = serde_json::to_string(rows).map_err(|source| StoreError::Encode {
            key: R::KEY.to_string(),
            source,
        })?;
        self.writes.push((R::KEY, blob));
        Ok(self)
    }

    /// Write every staged collection, compensating on failure
    ///
    /// # Errors
    /// The first store error; earlier writes are rolled back
    pub async fn commit(self) -> Result<(), StoreError> {
        let store = &self.db.store;
        let mut written: Vec<(&'static str, Option<String>)> = Vec::new();
        for (key, blob) in self.writes {
            let outcome = match store.load(key).await {
                Ok(previous) => store.save(key, blob).await.map(|()| previous),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(previous) => written.push((key, previous)),
                Err(err) => {
                    tracing::warn!(%err, key, rollback = written.len(), "write failed; restoring collections");
                    for (key, previous) in written.into_iter().rev() {
                        let blob = previous.unwrap_or_else(|| "[]".to_string());
                        if let Err(restore_err) = store.save(key, blob).await {
                            tracing::error!(%restore_err, key, "failed to restore collection");
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, CategoryId, ProductId, Supplier};

    fn category(id: u32, name: &str) -> Category {
        Category {
            id: CategoryId(id),
            name: name.to_string(),
            description: String::new(),
            product_count: 0,
        }
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let db = Db::in_memory();
        let rows: Vec<Category> = db.load().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let db = Db::in_memory();
        db.save(&[category(1, "Tools"), category(2, "Paint")])
            .await
            .unwrap();
        let rows: Vec<Category> = db.load().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "Paint");
    }

    #[tokio::test]
    async fn corrupt_blob_is_reported() {
        let store = Arc::new(MemoryStore::new());
        store
            .save(Category::KEY, "{not json".to_string())
            .await
            .unwrap();
        let db = Db::new(store);
        let err = db.load::<Category>().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == Category::KEY));
    }

    #[test]
    fn next_id_follows_max() {
        assert_eq!(next_id::<Category>(&[]).unwrap(), CategoryId(1));
        assert_eq!(
            next_id(&[category(3, "a"), category(9, "b"), category(4, "c")]).unwrap(),
            CategoryId(10)
        );
    }

    #[test]
    fn next_id_stops_at_max() {
        let err = next_id(&[category(u32::MAX, "full")]).unwrap_err();
        assert!(matches!(err, StoreError::IdsExhausted(ref key) if key == Category::KEY));
    }

    #[tokio::test]
    async fn purchase_orders_use_browser_key() {
        let store = Arc::new(MemoryStore::new());
        store
            .save("purchaseOrders", "[]".to_string())
            .await
            .unwrap();
        assert_eq!(PurchaseOrder::KEY, "purchaseOrders");
        let db = Db::new(store);
        assert!(db.load::<PurchaseOrder>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data")).await.unwrap();
        assert_eq!(store.load("stockkeep_products").await.unwrap(), None);

        store
            .save("stockkeep_products", "[]".to_string())
            .await
            .unwrap();

        let reopened = FileStore::open(dir.path().join("data")).await.unwrap();
        assert_eq!(
            reopened.load("stockkeep_products").await.unwrap().as_deref(),
            Some("[]")
        );
        assert!(dir.path().join("data/stockkeep_products.json").exists());
    }

    #[tokio::test]
    async fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let err = store.load("../escape").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    /// Memory store that refuses writes to one key
    #[derive(Debug)]
    struct RefusingStore {
        inner: MemoryStore,
        refuse: &'static str,
    }

    #[async_trait]
    impl Store for RefusingStore {
        async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, blob: String) -> Result<(), StoreError> {
            if key == self.refuse {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.inner.save(key, blob).await
        }
    }

    #[tokio::test]
    async fn changeset_restores_earlier_writes_on_failure() {
        let db = Db::new(Arc::new(RefusingStore {
            inner: MemoryStore::new(),
            refuse: Supplier::KEY,
        }));
        db.save(&[category(1, "Before")]).await.unwrap();

        let result = db
            .changeset()
            .put(&[category(1, "After")])
            .unwrap()
            .put::<Supplier>(&[])
            .unwrap()
            .commit()
            .await;

        assert!(matches!(result, Err(StoreError::Io(_))));
        let rows: Vec<Category> = db.load().await.unwrap();
        assert_eq!(rows[0].name, "Before");
    }

    #[tokio::test]
    async fn changeset_writes_all_collections() {
        let db = Db::in_memory();
        db.changeset()
            .put(&[category(2, "Tools")])
            .unwrap()
            .put::<Supplier>(&[])
            .unwrap()
            .commit()
            .await
            .unwrap();
        let rows: Vec<Category> = db.load().await.unwrap();
        assert_eq!(rows[0].id, CategoryId(2));
        assert!(db.load::<Supplier>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_round_trip_through_import() {
        let db = Db::in_memory();
        let snapshot = Snapshot {
            categories: vec![category(1, "Tools")],
            ..Snapshot::default()
        };
        db.import(&snapshot).await.unwrap();
        assert_eq!(db.export().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn import_rejects_over_reserved_products() {
        let db = Db::in_memory();
        db.import(&Snapshot {
            categories: vec![category(1, "Kept")],
            ..Snapshot::default()
        })
        .await
        .unwrap();

        let now = chrono::Utc::now();
        let product = Product {
            id: ProductId(4),
            sku: "P-4".to_string(),
            name: "Valve".to_string(),
            category: CategoryId(1),
            supplier: None,
            quantity: 2,
            reserved_quantity: 5,
            min_stock_level: 0,
            price: 1.0,
            cost: 0.5,
            description: String::new(),
            created_at: now,
            updated_at: now,
        };
        let err = db
            .import(&Snapshot {
                products: vec![product],
                ..Snapshot::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidSnapshot(_)));
        let rows: Vec<Category> = db.load().await.unwrap();
        assert_eq!(rows[0].name, "Kept");
    }
}
