//! Stock reservation bookkeeping
//!
//! Every product carries two counters: `quantity` (units on hand) and
//! `reserved_quantity` (units promised to open sales orders). The operations
//! here keep them consistent:
//!
//! - `reserved_quantity <= quantity`, so `available = quantity - reserved`
//! - neither counter ever goes negative
//!
//! Multi-line changes go through [`StockBatch`], which stages every change on
//! a working copy. Nothing reaches the caller's products until
//! [`StockBatch::commit`]; dropping the batch after an error discards the
//! partial reservations.

use crate::error::InventoryError;
use crate::types::{LineItem, Product, ProductId, StockAdjustment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Change in on-hand units produced by a committed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub product_id: ProductId,
    /// Signed change in `quantity`
    pub change: i64,
    /// `quantity` after the change
    pub balance: u32,
}

/// Reserve `qty` units for an order
///
/// # Errors
/// - `InvalidQuantity` for zero
/// - `InsufficientStock` when fewer than `qty` units are unreserved
pub fn reserve(product: &mut Product, qty: u32) -> Result<(), InventoryError> {
    check_quantity(product.id, qty)?;
    let available = product.available();
    if available < qty {
        return Err(InventoryError::InsufficientStock {
            product: product.id,
            requested: qty,
            available,
        });
    }
    product.reserved_quantity += qty;
    Ok(())
}

/// Release up to `qty` reserved units; returns how many were released
pub fn release(product: &mut Product, qty: u32) -> u32 {
    let released = qty.min(product.reserved_quantity);
    if released < qty {
        tracing::warn!(
            product = %product.id,
            requested = qty,
            reserved = product.reserved_quantity,
            "release exceeds reservation; clamping"
        );
    }
    product.reserved_quantity -= released;
    released
}

/// Ship `qty` units, consuming the matching reservation
///
/// # Errors
/// - `InvalidQuantity` for zero
/// - `InsufficientOnHand` when fewer than `qty` units are on hand
pub fn fulfill(product: &mut Product, qty: u32) -> Result<(), InventoryError> {
    check_quantity(product.id, qty)?;
    if product.quantity < qty {
        return Err(InventoryError::InsufficientOnHand {
            product: product.id,
            requested: qty,
            on_hand: product.quantity,
        });
    }
    product.quantity -= qty;
    product.reserved_quantity -= qty.min(product.reserved_quantity);
    // Shipping unreserved stock can leave a reservation above what is left
    product.reserved_quantity = product.reserved_quantity.min(product.quantity);
    Ok(())
}

/// Add received units
pub fn receive(product: &mut Product, qty: u32) {
    product.quantity = product.quantity.saturating_add(qty);
}

/// Apply a manual adjustment; returns the signed change
///
/// The result is clamped at zero.
///
/// # Errors
/// `BelowReserved` if the new count would not cover the reservations
pub fn adjust(product: &mut Product, adjustment: StockAdjustment) -> Result<i64, InventoryError> {
    let current = i64::from(product.quantity);
    let target = match adjustment {
        StockAdjustment::Add(delta) => current.saturating_add(delta),
        StockAdjustment::Set(value) => i64::from(value),
    };
    let target = u32::try_from(target.max(0)).unwrap_or(u32::MAX);
    if target < product.reserved_quantity {
        return Err(InventoryError::BelowReserved {
            product: product.id,
            requested: target,
            reserved: product.reserved_quantity,
        });
    }
    product.quantity = target;
    Ok(i64::from(target) - current)
}

fn check_quantity(product: ProductId, quantity: u32) -> Result<(), InventoryError> {
    if quantity == 0 {
        return Err(InventoryError::InvalidQuantity { product, quantity });
    }
    Ok(())
}

/// Staged multi-product stock change
///
/// ```rust,ignore
/// let mut batch = StockBatch::new(&mut products, Utc::now());
/// batch.release_lines(&old_items);
/// batch.reserve_lines(&new_items)?; // on error `products` is untouched
/// batch.commit();
/// ```
#[derive(Debug)]
pub struct StockBatch<'a> {
    target: &'a mut Vec<Product>,
    staged: Vec<Product>,
    movements: Vec<Movement>,
    now: DateTime<Utc>,
}

impl<'a> StockBatch<'a> {
    /// Start a batch over `products`
    #[must_use]
    pub fn new(products: &'a mut Vec<Product>, now: DateTime<Utc>) -> Self {
        let staged = products.clone();
        Self {
            target: products,
            staged,
            movements: Vec::new(),
            now,
        }
    }

    fn product(&mut self, id: ProductId) -> Result<&mut Product, InventoryError> {
        let now = self.now;
        let product = self
            .staged
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(InventoryError::UnknownProduct(id))?;
        product.updated_at = now;
        Ok(product)
    }

    /// Reserve one product
    ///
    /// # Errors
    /// See [`reserve`]
    pub fn reserve(&mut self, id: ProductId, qty: u32) -> Result<(), InventoryError> {
        reserve(self.product(id)?, qty)
    }

    /// Reserve every line, or fail on the first that does not fit
    ///
    /// # Errors
    /// See [`reserve`]
    pub fn reserve_lines(&mut self, items: &[LineItem]) -> Result<(), InventoryError> {
        for item in items {
            self.reserve(item.product_id, item.quantity)?;
        }
        Ok(())
    }

    /// Release one product
    ///
    /// # Errors
    /// `UnknownProduct` if the product is gone
    pub fn release(&mut self, id: ProductId, qty: u32) -> Result<u32, InventoryError> {
        Ok(release(self.product(id)?, qty))
    }

    /// Release every line
    ///
    /// Lines for products that no longer exist are skipped.
    pub fn release_lines(&mut self, items: &[LineItem]) {
        for item in items {
            if let Err(err) = self.release(item.product_id, item.quantity) {
                tracing::warn!(%err, "skipping release for missing product");
            }
        }
    }

    /// Ship every line
    ///
    /// # Errors
    /// See [`fulfill`]
    pub fn fulfill_lines(&mut self, items: &[LineItem]) -> Result<(), InventoryError> {
        for item in items {
            let product = self.product(item.product_id)?;
            fulfill(product, item.quantity)?;
            let movement = Movement {
                product_id: product.id,
                change: -i64::from(item.quantity),
                balance: product.quantity,
            };
            self.movements.push(movement);
        }
        Ok(())
    }

    /// Add received units to one product
    ///
    /// # Errors
    /// `UnknownProduct` if the product is gone
    pub fn receive(&mut self, id: ProductId, qty: u32) -> Result<(), InventoryError> {
        if qty == 0 {
            return Ok(());
        }
        let product = self.product(id)?;
        receive(product, qty);
        let movement = Movement {
            product_id: id,
            change: i64::from(qty),
            balance: product.quantity,
        };
        self.movements.push(movement);
        Ok(())
    }

    /// Adjust one product
    ///
    /// # Errors
    /// See [`adjust`]
    pub fn adjust(
        &mut self,
        id: ProductId,
        adjustment: StockAdjustment,
    ) -> Result<Movement, InventoryError> {
        let product = self.product(id)?;
        let change = adjust(product, adjustment)?;
        let movement = Movement {
            product_id: id,
            change,
            balance: product.quantity,
        };
        self.movements.push(movement);
        Ok(movement)
    }

    /// Staged view of a product
    #[must_use]
    pub fn peek(&self, id: ProductId) -> Option<&Product> {
        self.staged.iter().find(|p| p.id == id)
    }

    /// Write staged changes back; returns the on-hand movements
    pub fn commit(self) -> Vec<Movement> {
        *self.target = self.staged;
        self.movements
    }
}
