//! File-backed storage across process restarts.
//!
//! Guarantees exercised here:
//! - Every collection lives in its own `<key>.json` file.
//! - Reopening the data directory restores reservations and orders.
//! - A damaged collection file is reported, never silently replaced.
//! - Imports cannot start with more units reserved than on hand.
//! - A collection whose ids are used up refuses new records instead of wrapping.

use pretty_assertions::assert_eq;
use stockkeep_core::{
    Category, CategoryId, NewCategory, StockError, StockKeep, StockKeepConfig, StoreError,
};
use stockkeep_test_utils::{levels, sales_order, seed};

#[tokio::test]
async fn reopen_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = StockKeepConfig::new().with_data_dir(dir.path());

    let keep = StockKeep::open(config.clone()).await.unwrap();
    let cat = seed(&keep).await;
    let order = keep
        .sales_orders()
        .create(sales_order("Globex", &[(cat.hammer, 7)]))
        .await
        .unwrap();
    drop(keep);

    assert!(dir.path().join("stockkeep_products.json").exists());
    assert!(dir.path().join("stockkeep_sales_orders.json").exists());

    let reopened = StockKeep::open(config).await.unwrap();
    assert_eq!(levels(&reopened, cat.hammer).await, (50, 7));
    assert_eq!(
        reopened.sales_orders().get(order.id).await.unwrap().order_number,
        order.order_number
    );
}

#[tokio::test]
async fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("stockkeep_products.json"), "{not json").unwrap();

    let keep = StockKeep::open(StockKeepConfig::new().with_data_dir(dir.path()))
        .await
        .unwrap();
    let err = keep.products().get_all().await.unwrap_err();
    assert!(err.is_storage());
    assert!(matches!(
        err,
        StockError::Store(StoreError::Corrupt { ref key, .. }) if key == "stockkeep_products"
    ));
}

#[tokio::test]
async fn snapshot_moves_between_backends() {
    let dir = tempfile::tempdir().unwrap();
    let source = StockKeep::in_memory();
    seed(&source).await;
    let snapshot = source.export().await.unwrap();

    let target = StockKeep::open(StockKeepConfig::new().with_data_dir(dir.path()))
        .await
        .unwrap();
    target.import(&snapshot).await.unwrap();
    assert_eq!(target.export().await.unwrap(), snapshot);
    assert_eq!(target.products().get_all().await.unwrap().len(), 4);
}

/// An over-reserved product aborts the import and leaves the data untouched
#[tokio::test]
async fn import_rejects_over_reserved_product() {
    let source = StockKeep::in_memory();
    let cat = seed(&source).await;
    let mut snapshot = source.export().await.unwrap();
    let wrench = snapshot
        .products
        .iter_mut()
        .find(|p| p.id == cat.wrench)
        .unwrap();
    wrench.reserved_quantity = wrench.quantity + 1;

    let target = StockKeep::in_memory();
    let err = target.import(&snapshot).await.unwrap_err();
    assert!(matches!(err, StockError::Store(StoreError::InvalidSnapshot(_))));
    assert!(target.products().get_all().await.unwrap().is_empty());
}

/// Importing the largest possible id makes the next create fail cleanly
#[tokio::test]
async fn exhausted_ids_refuse_new_records() {
    let keep = StockKeep::in_memory();
    let mut snapshot = keep.export().await.unwrap();
    snapshot.categories.push(Category {
        id: CategoryId(u32::MAX),
        name: "Last".to_string(),
        description: String::new(),
        product_count: 0,
    });
    keep.import(&snapshot).await.unwrap();

    let err = keep
        .categories()
        .create(NewCategory { name: "Overflow".into(), ..NewCategory::default() })
        .await
        .unwrap_err();
    assert!(err.is_storage());
    assert!(matches!(
        err,
        StockError::Store(StoreError::IdsExhausted(ref key)) if key == "stockkeep_categories"
    ));
    assert_eq!(keep.categories().get_all().await.unwrap().len(), 1);
}
