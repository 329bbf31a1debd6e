//! Suppliers

use crate::error::{EntityKind, StockError, StockResult};
use crate::store::{next_id, Db};
use crate::types::{
    NewSupplier, Product, Supplier, SupplierId, SupplierPatch, DEFAULT_LEAD_TIME_DAYS,
    DEFAULT_PAYMENT_TERMS,
};

/// Supplier CRUD
#[derive(Debug, Clone)]
pub struct SupplierService {
    db: Db,
}

impl SupplierService {
    /// Create service over `db`
    #[inline]
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// All suppliers
    pub async fn get_all(&self) -> StockResult<Vec<Supplier>> {
        Ok(self.db.load().await?)
    }

    /// One supplier
    pub async fn get(&self, id: SupplierId) -> StockResult<Supplier> {
        let suppliers: Vec<Supplier> = self.db.load().await?;
        suppliers
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::Supplier, id))
    }

    /// Add a supplier, filling in default terms
    pub async fn create(&self, input: NewSupplier) -> StockResult<Supplier> {
        let _guard = self.db.write().await;
        let mut suppliers: Vec<Supplier> = self.db.load().await?;
        let supplier = Supplier {
            id: next_id(&suppliers)?,
            name: input.name,
            contact_person: input.contact_person,
            email: input.email,
            phone: input.phone,
            address: input.address,
            payment_terms: input
                .payment_terms
                .filter(|terms| !terms.is_empty())
                .unwrap_or_else(|| DEFAULT_PAYMENT_TERMS.to_string()),
            lead_time_days: input
                .lead_time_days
                .filter(|days| *days > 0)
                .unwrap_or(DEFAULT_LEAD_TIME_DAYS),
            performance_rating: input.performance_rating.unwrap_or(0.0),
            minimum_order_quantity: input.minimum_order_quantity.unwrap_or(0),
            notes: input.notes.unwrap_or_default(),
        };
        suppliers.push(supplier.clone());
        self.db.save(&suppliers).await?;
        tracing::info!(id = %supplier.id, name = %supplier.name, "created supplier");
        Ok(supplier)
    }

    /// Update fields; unset fields keep their current values
    pub async fn update(&self, id: SupplierId, patch: SupplierPatch) -> StockResult<Supplier> {
        let _guard = self.db.write().await;
        let mut suppliers: Vec<Supplier> = self.db.load().await?;
        let supplier = suppliers
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::Supplier, id))?;

        if let Some(name) = patch.name {
            supplier.name = name;
        }
        if let Some(contact) = patch.contact_person {
            supplier.contact_person = contact;
        }
        if let Some(email) = patch.email {
            supplier.email = email;
        }
        if let Some(phone) = patch.phone {
            supplier.phone = phone;
        }
        if let Some(address) = patch.address {
            supplier.address = address;
        }
        if let Some(terms) = patch.payment_terms.filter(|terms| !terms.is_empty()) {
            supplier.payment_terms = terms;
        }
        if let Some(days) = patch.lead_time_days.filter(|days| *days > 0) {
            supplier.lead_time_days = days;
        }
        if let Some(rating) = patch.performance_rating {
            supplier.performance_rating = rating;
        }
        if let Some(moq) = patch.minimum_order_quantity {
            supplier.minimum_order_quantity = moq;
        }
        if let Some(notes) = patch.notes {
            supplier.notes = notes;
        }

        let updated = supplier.clone();
        self.db.save(&suppliers).await?;
        Ok(updated)
    }

    /// Remove a supplier no product refers to
    pub async fn delete(&self, id: SupplierId) -> StockResult<()> {
        let _guard = self.db.write().await;
        let products: Vec<Product> = self.db.load().await?;
        if products.iter().any(|p| p.supplier == Some(id)) {
            return Err(StockError::Conflict(
                "Cannot delete supplier that has associated products".to_string(),
            ));
        }
        let mut suppliers: Vec<Supplier> = self.db.load().await?;
        let before = suppliers.len();
        suppliers.retain(|s| s.id != id);
        if suppliers.len() == before {
            return Err(StockError::not_found(EntityKind::Supplier, id));
        }
        self.db.save(&suppliers).await?;
        tracing::info!(id = %id, "deleted supplier");
        Ok(())
    }

    /// Products sourced from a supplier
    pub async fn products(&self, id: SupplierId) -> StockResult<Vec<Product>> {
        let mut products: Vec<Product> = self.db.load().await?;
        products.retain(|p| p.supplier == Some(id));
        Ok(products)
    }
}
