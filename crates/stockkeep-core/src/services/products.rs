//! Product catalog and direct stock operations

use crate::error::{EntityKind, StockError, StockResult};
use crate::inventory::StockBatch;
use crate::services::transactions::stage_movements;
use crate::store::{next_id, Db};
use crate::types::{
    Category, CategoryId, LineItem, NewProduct, Product, ProductId, ProductPatch, StockAdjustment,
    Supplier, SupplierId, Transaction, TransactionKind,
};
use chrono::Utc;

pub(crate) fn find_product(products: &[Product], id: ProductId) -> StockResult<&Product> {
    products
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| StockError::not_found(EntityKind::Product, id))
}

/// Product CRUD plus reserve / release / fulfill on single products
#[derive(Debug, Clone)]
pub struct ProductService {
    db: Db,
}

impl ProductService {
    /// Create service over `db`
    #[inline]
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// All products
    pub async fn get_all(&self) -> StockResult<Vec<Product>> {
        Ok(self.db.load().await?)
    }

    /// One product
    pub async fn get(&self, id: ProductId) -> StockResult<Product> {
        let products: Vec<Product> = self.db.load().await?;
        find_product(&products, id).cloned()
    }

    async fn check_references(
        &self,
        category: CategoryId,
        supplier: Option<SupplierId>,
    ) -> StockResult<()> {
        let categories: Vec<Category> = self.db.load().await?;
        if !categories.iter().any(|c| c.id == category) {
            return Err(StockError::InvalidInput(format!(
                "category {category} does not exist"
            )));
        }
        if let Some(supplier) = supplier {
            let suppliers: Vec<Supplier> = self.db.load().await?;
            if !suppliers.iter().any(|s| s.id == supplier) {
                return Err(StockError::InvalidInput(format!(
                    "supplier {supplier} does not exist"
                )));
            }
        }
        Ok(())
    }

    /// Add a product; SKUs are unique
    pub async fn create(&self, input: NewProduct) -> StockResult<Product> {
        let _guard = self.db.write().await;
        self.check_references(input.category, input.supplier).await?;
        let mut products: Vec<Product> = self.db.load().await?;
        if products.iter().any(|p| p.sku.eq_ignore_ascii_case(&input.sku)) {
            return Err(StockError::Conflict(format!(
                "SKU {} is already in use",
                input.sku
            )));
        }

        let now = Utc::now();
        let product = Product {
            id: next_id(&products)?,
            sku: input.sku,
            name: input.name,
            category: input.category,
            supplier: input.supplier,
            quantity: input.quantity,
            reserved_quantity: 0,
            min_stock_level: input.min_stock_level,
            price: input.price,
            cost: input.cost,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        products.push(product.clone());
        self.db.save(&products).await?;
        tracing::info!(id = %product.id, sku = %product.sku, "created product");
        Ok(product)
    }

    /// Update fields; a new quantity is booked as an adjustment
    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> StockResult<Product> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let current = find_product(&products, id)?.clone();
        if patch.category.is_some() || patch.supplier.is_some() {
            self.check_references(
                patch.category.unwrap_or(current.category),
                patch.supplier.or(current.supplier),
            )
            .await?;
        }
        if let Some(sku) = &patch.sku {
            if products
                .iter()
                .any(|p| p.id != id && p.sku.eq_ignore_ascii_case(sku))
            {
                return Err(StockError::Conflict(format!("SKU {sku} is already in use")));
            }
        }

        let now = Utc::now();
        let mut batch = StockBatch::new(&mut products, now);
        if let Some(quantity) = patch.quantity {
            if quantity != current.quantity {
                batch.adjust(id, StockAdjustment::Set(quantity))?;
            }
        }
        let movements = batch.commit();

        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::Product, id))?;
        if let Some(sku) = patch.sku {
            product.sku = sku;
        }
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        if let Some(supplier) = patch.supplier {
            product.supplier = Some(supplier);
        }
        if let Some(min) = patch.min_stock_level {
            product.min_stock_level = min;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(cost) = patch.cost {
            product.cost = cost;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        product.updated_at = now;
        let updated = product.clone();

        let mut ledger: Vec<Transaction> = self.db.load().await?;
        stage_movements(
            &mut ledger,
            &movements,
            TransactionKind::Adjustment,
            None,
            "product edit",
            now,
        )?;
        self.db
            .changeset()
            .put(&products)?
            .put(&ledger)?
            .commit()
            .await?;
        tracing::info!(id = %id, "updated product");
        Ok(updated)
    }

    /// Remove a product that holds no reservations
    pub async fn delete(&self, id: ProductId) -> StockResult<()> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let product = find_product(&products, id)?;
        if product.reserved_quantity > 0 {
            return Err(StockError::Conflict(format!(
                "Cannot delete product with {} units reserved by open orders",
                product.reserved_quantity
            )));
        }
        products.retain(|p| p.id != id);
        self.db.save(&products).await?;
        tracing::info!(id = %id, "deleted product");
        Ok(())
    }

    /// Products at or below `threshold`, or their own minimum stock level
    pub async fn low_stock(&self, threshold: Option<u32>) -> StockResult<Vec<Product>> {
        let mut products: Vec<Product> = self.db.load().await?;
        products.retain(|p| p.quantity <= threshold.unwrap_or(p.min_stock_level));
        Ok(products)
    }

    /// Products in a category
    pub async fn by_category(&self, category: CategoryId) -> StockResult<Vec<Product>> {
        let mut products: Vec<Product> = self.db.load().await?;
        products.retain(|p| p.category == category);
        Ok(products)
    }

    /// Products from a supplier
    pub async fn by_supplier(&self, supplier: SupplierId) -> StockResult<Vec<Product>> {
        let mut products: Vec<Product> = self.db.load().await?;
        products.retain(|p| p.supplier == Some(supplier));
        Ok(products)
    }

    /// Add to or overwrite the on-hand count
    pub async fn update_stock(
        &self,
        id: ProductId,
        adjustment: StockAdjustment,
        notes: &str,
    ) -> StockResult<Product> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let now = Utc::now();
        let mut batch = StockBatch::new(&mut products, now);
        batch.adjust(id, adjustment)?;
        let movements = batch.commit();

        let mut ledger: Vec<Transaction> = self.db.load().await?;
        stage_movements(
            &mut ledger,
            &movements,
            TransactionKind::Adjustment,
            None,
            notes,
            now,
        )?;
        self.db
            .changeset()
            .put(&products)?
            .put(&ledger)?
            .commit()
            .await?;
        let product = find_product(&products, id)?.clone();
        tracing::info!(id = %id, quantity = product.quantity, "stock updated");
        Ok(product)
    }

    /// Hold units for an order
    pub async fn reserve_stock(&self, id: ProductId, qty: u32) -> StockResult<Product> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let mut batch = StockBatch::new(&mut products, Utc::now());
        batch.reserve(id, qty)?;
        batch.commit();
        self.db.save(&products).await?;
        let product = find_product(&products, id)?.clone();
        tracing::debug!(id = %id, qty, reserved = product.reserved_quantity, "reserved stock");
        Ok(product)
    }

    /// Give back held units
    pub async fn release_stock(&self, id: ProductId, qty: u32) -> StockResult<Product> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let mut batch = StockBatch::new(&mut products, Utc::now());
        batch.release(id, qty)?;
        batch.commit();
        self.db.save(&products).await?;
        let product = find_product(&products, id)?.clone();
        tracing::debug!(id = %id, qty, reserved = product.reserved_quantity, "released stock");
        Ok(product)
    }

    /// Ship units, consuming their reservation
    pub async fn fulfill_stock(&self, id: ProductId, qty: u32) -> StockResult<Product> {
        let _guard = self.db.write().await;
        let mut products: Vec<Product> = self.db.load().await?;
        let now = Utc::now();
        let mut batch = StockBatch::new(&mut products, now);
        let line = LineItem::new(id, qty, 0.0);
        batch.fulfill_lines(&[line])?;
        let movements = batch.commit();

        let mut ledger: Vec<Transaction> = self.db.load().await?;
        stage_movements(
            &mut ledger,
            &movements,
            TransactionKind::StockOut,
            None,
            "",
            now,
        )?;
        self.db
            .changeset()
            .put(&products)?
            .put(&ledger)?
            .commit()
            .await?;
        Ok(find_product(&products, id)?.clone())
    }
}
