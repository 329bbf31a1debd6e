//! Testing utilities for StockKeep workspace
//!
//! Shared fixtures: a small seeded catalog and order helpers.

#![allow(missing_docs)]

use stockkeep_core::{
    CategoryId, Customer, NewCategory, NewProduct, NewPurchaseOrder, NewSalesOrder, NewSupplier,
    OrderLine, Product, ProductId, PurchaseLineInput, StockKeep, SupplierId,
};

/// Ids of the seeded catalog
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    pub tools: CategoryId,
    pub fasteners: CategoryId,
    pub acme: SupplierId,
    pub bolt_co: SupplierId,
    /// 50 on hand, min 10, $24.99
    pub hammer: ProductId,
    /// 8 on hand, min 10, $12.50
    pub wrench: ProductId,
    /// 0 on hand, min 20, $0.25
    pub bolt: ProductId,
    /// 200 on hand, min 50, $0.10
    pub nut: ProductId,
}

async fn add(
    keep: &StockKeep,
    (sku, name): (&str, &str),
    category: CategoryId,
    supplier: SupplierId,
    (quantity, min, price): (u32, u32, f64),
) -> ProductId {
    let input = NewProduct {
        sku: sku.to_string(),
        name: name.to_string(),
        category,
        supplier: Some(supplier),
        quantity,
        min_stock_level: min,
        price,
        cost: price / 2.0,
        description: String::new(),
    };
    keep.products().create(input).await.unwrap().id
}

/// Fill `keep` with two categories, two suppliers and four products
pub async fn seed(keep: &StockKeep) -> Catalog {
    let tools = keep
        .categories()
        .create(NewCategory { name: "Tools".into(), ..NewCategory::default() })
        .await
        .unwrap()
        .id;
    let fasteners = keep
        .categories()
        .create(NewCategory { name: "Fasteners".into(), ..NewCategory::default() })
        .await
        .unwrap()
        .id;
    let acme = keep
        .suppliers()
        .create(NewSupplier {
            name: "Acme Supply".into(),
            email: "orders@acme.test".into(),
            ..NewSupplier::default()
        })
        .await
        .unwrap()
        .id;
    let bolt_co = keep
        .suppliers()
        .create(NewSupplier { name: "Bolt Co".into(), ..NewSupplier::default() })
        .await
        .unwrap()
        .id;

    let hammer = add(keep, ("HAM-001", "Claw Hammer"), tools, acme, (50, 10, 24.99)).await;
    let wrench = add(keep, ("WRN-001", "Adjustable Wrench"), tools, acme, (8, 10, 12.5)).await;
    let bolt = add(keep, ("BLT-001", "M8 Bolt"), fasteners, bolt_co, (0, 20, 0.25)).await;
    let nut = add(keep, ("NUT-001", "M8 Nut"), fasteners, bolt_co, (200, 50, 0.1)).await;

    Catalog { tools, fasteners, acme, bolt_co, hammer, wrench, bolt, nut }
}

/// In-memory instance with the seeded catalog
pub async fn seeded() -> (StockKeep, Catalog) {
    let keep = StockKeep::in_memory();
    let catalog = seed(&keep).await;
    (keep, catalog)
}

/// Sales order input for `customer` with `(product, quantity)` lines
pub fn sales_order(customer: &str, lines: &[(ProductId, u32)]) -> NewSalesOrder {
    NewSalesOrder {
        customer: Customer::named(customer),
        line_items: lines.iter().map(|(id, qty)| OrderLine::new(*id, *qty)).collect(),
        ..NewSalesOrder::default()
    }
}

/// Purchase order input with `(product, quantity, unit price)` lines
pub fn purchase_order(supplier: SupplierId, lines: &[(ProductId, u32, f64)]) -> NewPurchaseOrder {
    NewPurchaseOrder {
        supplier_id: supplier,
        order_date: None,
        expected_delivery_date: None,
        status: None,
        notes: String::new(),
        line_items: lines
            .iter()
            .map(|(id, qty, price)| PurchaseLineInput {
                product_id: *id,
                quantity: *qty,
                unit_price: *price,
            })
            .collect(),
    }
}

/// `(quantity, reserved)` of a product
pub async fn levels(keep: &StockKeep, id: ProductId) -> (u32, u32) {
    let product: Product = keep.products().get(id).await.unwrap();
    (product.quantity, product.reserved_quantity)
}
