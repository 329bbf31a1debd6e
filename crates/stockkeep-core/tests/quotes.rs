//! Quote to sales order conversion.
//!
//! Guarantees exercised here:
//! - Only accepted quotes convert.
//! - Conversion reserves stock and marks the quote converted in one step.
//! - A conversion that cannot be reserved leaves the quote accepted.

use pretty_assertions::assert_eq;
use stockkeep_core::{Customer, NewQuote, OrderLine, QuoteStatus, SalesOrderStatus};
use stockkeep_test_utils::{levels, seeded};

fn quote_for(lines: Vec<OrderLine>) -> NewQuote {
    NewQuote {
        customer: Customer::named("Globex"),
        line_items: lines,
        ..NewQuote::default()
    }
}

#[tokio::test]
async fn accepted_quote_converts() {
    let (keep, cat) = seeded().await;
    let quote = keep
        .quotes()
        .create(quote_for(vec![OrderLine::new(cat.hammer, 4).at_price(20.0)]))
        .await
        .unwrap();
    assert_eq!(quote.status, QuoteStatus::Draft);
    assert_eq!(quote.totals.total, 87.2);

    assert!(keep.sales_orders().convert_quote(quote.id).await.is_err());

    keep.quotes()
        .update_status(quote.id, QuoteStatus::Accepted)
        .await
        .unwrap();
    let order = keep.sales_orders().convert_quote(quote.id).await.unwrap();

    assert_eq!(order.quote_id, Some(quote.id));
    assert_eq!(order.status, SalesOrderStatus::Pending);
    assert_eq!(order.totals, quote.totals);
    assert_eq!(order.line_items[0].unit_price, 20.0);
    assert_eq!(levels(&keep, cat.hammer).await, (50, 4));
    assert_eq!(
        keep.quotes().get(quote.id).await.unwrap().status,
        QuoteStatus::Converted
    );
}

#[tokio::test]
async fn failed_conversion_keeps_quote_accepted() {
    let (keep, cat) = seeded().await;
    let quote = keep
        .quotes()
        .create(quote_for(vec![OrderLine::new(cat.wrench, 9)]))
        .await
        .unwrap();
    keep.quotes()
        .update_status(quote.id, QuoteStatus::Accepted)
        .await
        .unwrap();

    assert!(keep.sales_orders().convert_quote(quote.id).await.is_err());
    assert_eq!(
        keep.quotes().get(quote.id).await.unwrap().status,
        QuoteStatus::Accepted
    );
    assert_eq!(levels(&keep, cat.wrench).await, (8, 0));
}

#[tokio::test]
async fn create_from_quote_links_order() {
    let (keep, cat) = seeded().await;
    let quote = keep
        .quotes()
        .create(quote_for(vec![OrderLine::new(cat.nut, 10)]))
        .await
        .unwrap();
    let order = keep
        .sales_orders()
        .create_from_quote(quote.id, &quote)
        .await
        .unwrap();
    assert_eq!(order.quote_id, Some(quote.id));
    assert_eq!(order.customer.customer_name, "Globex");
    assert_eq!(levels(&keep, cat.nut).await, (200, 10));
}
