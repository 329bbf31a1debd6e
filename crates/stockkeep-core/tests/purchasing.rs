//! Purchase orders feeding stock back into the catalog.
//!
//! Guarantees exercised here:
//! - Receipts add on-hand units and record `in` transactions.
//! - Completing an order receives what is still outstanding.
//! - Received stock immediately becomes available to sales orders.

use pretty_assertions::assert_eq;
use stockkeep_core::{PurchaseOrderStatus, Receipt, TransactionKind};
use stockkeep_test_utils::{levels, purchase_order, sales_order, seeded};

/// Receiving out-of-stock items lets a previously failing order through.
#[tokio::test]
async fn receipt_unblocks_sales_order() {
    let (keep, cat) = seeded().await;
    assert!(keep
        .sales_orders()
        .create(sales_order("Globex", &[(cat.bolt, 100)]))
        .await
        .is_err());

    let po = keep
        .purchase_orders()
        .create(purchase_order(cat.bolt_co, &[(cat.bolt, 500, 0.1)]))
        .await
        .unwrap();
    assert_eq!(po.total, 50.0);
    keep.purchase_orders()
        .update_status(po.id, PurchaseOrderStatus::Submitted)
        .await
        .unwrap();
    let po = keep
        .purchase_orders()
        .receive(po.id, &[Receipt { product_id: cat.bolt, quantity: 200 }])
        .await
        .unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::PartiallyReceived);

    keep.sales_orders()
        .create(sales_order("Globex", &[(cat.bolt, 100)]))
        .await
        .unwrap();
    assert_eq!(levels(&keep, cat.bolt).await, (200, 100));
}

/// Completing by status receives the remainder and logs it.
#[tokio::test]
async fn completion_receives_remainder() {
    let (keep, cat) = seeded().await;
    let purchasing = keep.purchase_orders();
    let po = purchasing
        .create(purchase_order(cat.acme, &[(cat.hammer, 10, 12.0), (cat.wrench, 20, 6.0)]))
        .await
        .unwrap();
    purchasing
        .receive(po.id, &[Receipt { product_id: cat.wrench, quantity: 5 }])
        .await
        .unwrap();
    let done = purchasing
        .update_status(po.id, PurchaseOrderStatus::Completed)
        .await
        .unwrap();

    assert!(done.fully_received());
    assert_eq!(levels(&keep, cat.hammer).await, (60, 0));
    assert_eq!(levels(&keep, cat.wrench).await, (28, 0));

    let ins: Vec<_> = keep
        .transactions()
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TransactionKind::StockIn)
        .collect();
    assert_eq!(ins.len(), 3);
    assert!(ins.iter().all(|t| t.reference.as_deref() == Some(po.po_number.as_str())));

    let dashboard = keep.dashboard().stats().await.unwrap();
    assert_eq!(dashboard.open_purchase_orders, 0);
}

/// The recent list is newest first and honours the configured length.
#[tokio::test]
async fn recent_purchase_orders_use_config_limit() {
    let (keep, cat) = seeded().await;
    for _ in 0..7 {
        keep.purchase_orders()
            .create(purchase_order(cat.acme, &[(cat.hammer, 1, 1.0)]))
            .await
            .unwrap();
    }
    let recent = keep.recent_purchase_orders().await.unwrap();
    assert_eq!(recent.len(), keep.config().recent_purchase_orders);
    assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}
