//! Product categories

use crate::error::{EntityKind, StockError, StockResult};
use crate::store::{next_id, Db};
use crate::types::{Category, CategoryId, CategoryPatch, NewCategory, Product};

/// Category CRUD
#[derive(Debug, Clone)]
pub struct CategoryService {
    db: Db,
}

impl CategoryService {
    /// Create service over `db`
    #[inline]
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// All categories with current product counts
    pub async fn get_all(&self) -> StockResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.db.load().await?;
        let products: Vec<Product> = self.db.load().await?;
        for category in &mut categories {
            category.product_count = products
                .iter()
                .filter(|p| p.category == category.id)
                .count();
        }
        Ok(categories)
    }

    /// One category
    pub async fn get(&self, id: CategoryId) -> StockResult<Category> {
        let categories: Vec<Category> = self.db.load().await?;
        categories
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::Category, id))
    }

    /// Add a category
    pub async fn create(&self, input: NewCategory) -> StockResult<Category> {
        let _guard = self.db.write().await;
        let mut categories: Vec<Category> = self.db.load().await?;
        let category = Category {
            id: next_id(&categories)?,
            name: input.name,
            description: input.description,
            product_count: 0,
        };
        categories.push(category.clone());
        self.db.save(&categories).await?;
        tracing::info!(id = %category.id, name = %category.name, "created category");
        Ok(category)
    }

    /// Rename or redescribe a category
    pub async fn update(&self, id: CategoryId, patch: CategoryPatch) -> StockResult<Category> {
        let _guard = self.db.write().await;
        let mut categories: Vec<Category> = self.db.load().await?;
        let category = categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::Category, id))?;
        if let Some(name) = patch.name {
            category.name = name;
        }
        if let Some(description) = patch.description {
            category.description = description;
        }
        let updated = category.clone();
        self.db.save(&categories).await?;
        Ok(updated)
    }

    /// Remove an empty category
    pub async fn delete(&self, id: CategoryId) -> StockResult<()> {
        let _guard = self.db.write().await;
        let products: Vec<Product> = self.db.load().await?;
        if products.iter().any(|p| p.category == id) {
            return Err(StockError::Conflict(
                "Cannot delete category that contains products".to_string(),
            ));
        }
        let mut categories: Vec<Category> = self.db.load().await?;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(StockError::not_found(EntityKind::Category, id));
        }
        self.db.save(&categories).await?;
        tracing::info!(id = %id, "deleted category");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::products::ProductService;
    use crate::types::NewProduct;

    fn named(name: &str) -> NewCategory {
        NewCategory {
            name: name.into(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn counts_products_on_listing() {
        let db = Db::in_memory();
        let categories = CategoryService::new(db.clone());
        let products = ProductService::new(db);
        let tools = categories.create(named("Tools")).await.unwrap();
        let paint = categories.create(named("Paint")).await.unwrap();
        assert_eq!(tools.product_count, 0);

        for sku in ["T-1", "T-2"] {
            products
                .create(NewProduct {
                    sku: sku.into(),
                    name: sku.into(),
                    category: tools.id,
                    price: 1.0,
                    ..NewProduct::default()
                })
                .await
                .unwrap();
        }

        let listed = categories.get_all().await.unwrap();
        let count = |id: CategoryId| listed.iter().find(|c| c.id == id).unwrap().product_count;
        assert_eq!(count(tools.id), 2);
        assert_eq!(count(paint.id), 0);
    }

    #[tokio::test]
    async fn delete_rules() {
        let db = Db::in_memory();
        let categories = CategoryService::new(db.clone());
        let tools = categories.create(named("Tools")).await.unwrap();
        ProductService::new(db)
            .create(NewProduct {
                sku: "T-1".into(),
                name: "Hammer".into(),
                category: tools.id,
                price: 9.0,
                ..NewProduct::default()
            })
            .await
            .unwrap();

        let err = categories.delete(tools.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete category that contains products");
        assert!(categories.delete(CategoryId(42)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_keeps_unset_fields() {
        let categories = CategoryService::new(Db::in_memory());
        let created = categories
            .create(NewCategory {
                name: "Tools".into(),
                description: "Hand tools".into(),
            })
            .await
            .unwrap();
        let updated = categories
            .update(
                created.id,
                CategoryPatch {
                    name: Some("Hand Tools".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Hand Tools");
        assert_eq!(updated.description, "Hand tools");
    }
}
