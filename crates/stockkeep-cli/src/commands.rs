//! Command dispatch; every command prints one JSON document

use crate::cli::{
    CategoryCommand, Command, JsonBody, OrderCommand, ProductCommand, PurchaseOrderCommand,
    QuoteCommand, SupplierCommand, TransactionArgs,
};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use stockkeep_core::{NewCategory, Receipt, Snapshot, StockAdjustment, StockKeep};

impl JsonBody {
    /// Decode the body, reading `@path` bodies from disk
    fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        let text = match self.json.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read JSON body from {path}"))?,
            None => self.json.clone(),
        };
        serde_json::from_str(&text).context("invalid JSON body")
    }
}

fn to_value(value: impl Serialize) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn deleted(id: impl std::fmt::Display) -> Value {
    json!({ "deleted": id.to_string() })
}

/// Run one command and return its output document
pub async fn run(keep: &StockKeep, command: Command) -> Result<Value> {
    match command {
        Command::Product(cmd) => product(keep, cmd).await,
        Command::Category(cmd) => category(keep, cmd).await,
        Command::Supplier(cmd) => supplier(keep, cmd).await,
        Command::Quote(cmd) => quote(keep, cmd).await,
        Command::Order(cmd) => order(keep, cmd).await,
        Command::Po(cmd) => purchase_order(keep, cmd).await,
        Command::Transactions(args) => transactions(keep, args).await,
        Command::Dashboard => to_value(keep.dashboard().stats().await?),
        Command::Export { output } => export(keep, output.as_deref()).await,
        Command::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read snapshot {}", file.display()))?;
            let snapshot: Snapshot = serde_json::from_str(&text).context("invalid snapshot")?;
            keep.import(&snapshot).await?;
            Ok(json!({
                "imported": {
                    "products": snapshot.products.len(),
                    "categories": snapshot.categories.len(),
                    "suppliers": snapshot.suppliers.len(),
                    "transactions": snapshot.transactions.len(),
                    "quotes": snapshot.quotes.len(),
                    "salesOrders": snapshot.sales_orders.len(),
                    "purchaseOrders": snapshot.purchase_orders.len(),
                }
            }))
        }
    }
}

async fn product(keep: &StockKeep, cmd: ProductCommand) -> Result<Value> {
    let products = keep.products();
    match cmd {
        ProductCommand::List { category, supplier } => match (category, supplier) {
            (Some(category), _) => to_value(products.by_category(category).await?),
            (None, Some(supplier)) => to_value(products.by_supplier(supplier).await?),
            (None, None) => to_value(products.get_all().await?),
        },
        ProductCommand::Get { id } => to_value(products.get(id).await?),
        ProductCommand::Create(body) => to_value(products.create(body.parse()?).await?),
        ProductCommand::Update { id, body } => to_value(products.update(id, body.parse()?).await?),
        ProductCommand::Delete { id } => {
            products.delete(id).await?;
            Ok(deleted(id))
        }
        ProductCommand::LowStock { threshold } => to_value(keep.low_stock(threshold).await?),
        ProductCommand::Adjust { id, add, set, notes } => {
            let adjustment = match (add, set) {
                (_, Some(quantity)) => StockAdjustment::Set(quantity),
                (Some(delta), None) => StockAdjustment::Add(delta),
                (None, None) => anyhow::bail!("either --add or --set is required"),
            };
            to_value(products.update_stock(id, adjustment, &notes).await?)
        }
    }
}

async fn category(keep: &StockKeep, cmd: CategoryCommand) -> Result<Value> {
    let categories = keep.categories();
    match cmd {
        CategoryCommand::List => to_value(categories.get_all().await?),
        CategoryCommand::Get { id } => to_value(categories.get(id).await?),
        CategoryCommand::Create { name, description } => {
            to_value(categories.create(NewCategory { name, description }).await?)
        }
        CategoryCommand::Update { id, body } => {
            to_value(categories.update(id, body.parse()?).await?)
        }
        CategoryCommand::Delete { id } => {
            categories.delete(id).await?;
            Ok(deleted(id))
        }
    }
}

async fn supplier(keep: &StockKeep, cmd: SupplierCommand) -> Result<Value> {
    let suppliers = keep.suppliers();
    match cmd {
        SupplierCommand::List => to_value(suppliers.get_all().await?),
        SupplierCommand::Get { id } => to_value(suppliers.get(id).await?),
        SupplierCommand::Create(body) => to_value(suppliers.create(body.parse()?).await?),
        SupplierCommand::Update { id, body } => to_value(suppliers.update(id, body.parse()?).await?),
        SupplierCommand::Delete { id } => {
            suppliers.delete(id).await?;
            Ok(deleted(id))
        }
        SupplierCommand::Products { id } => to_value(suppliers.products(id).await?),
    }
}

async fn quote(keep: &StockKeep, cmd: QuoteCommand) -> Result<Value> {
    let quotes = keep.quotes();
    match cmd {
        QuoteCommand::List { status, customer } => match (status, customer) {
            (Some(status), _) => to_value(quotes.by_status(status).await?),
            (None, Some(name)) => to_value(quotes.by_customer(&name).await?),
            (None, None) => to_value(quotes.get_all().await?),
        },
        QuoteCommand::Get { id } => to_value(quotes.get(id).await?),
        QuoteCommand::Create(body) => to_value(quotes.create(body.parse()?).await?),
        QuoteCommand::Update { id, body } => to_value(quotes.update(id, body.parse()?).await?),
        QuoteCommand::Status { id, status } => to_value(quotes.update_status(id, status).await?),
        QuoteCommand::Delete { id } => {
            quotes.delete(id).await?;
            Ok(deleted(id))
        }
        QuoteCommand::Convert { id } => to_value(keep.sales_orders().convert_quote(id).await?),
    }
}

async fn order(keep: &StockKeep, cmd: OrderCommand) -> Result<Value> {
    let orders = keep.sales_orders();
    match cmd {
        OrderCommand::List { status, customer } => match (status, customer) {
            (Some(status), _) => to_value(orders.by_status(status).await?),
            (None, Some(name)) => to_value(orders.by_customer(&name).await?),
            (None, None) => to_value(orders.get_all().await?),
        },
        OrderCommand::Get { id } => to_value(orders.get(id).await?),
        OrderCommand::Create(body) => to_value(orders.create(body.parse()?).await?),
        OrderCommand::Update { id, body } => to_value(orders.update(id, body.parse()?).await?),
        OrderCommand::Status { id, status } => to_value(orders.update_status(id, status).await?),
        OrderCommand::Fulfill { id } => to_value(orders.fulfill(id).await?),
        OrderCommand::Delete { id } => {
            orders.delete(id).await?;
            Ok(deleted(id))
        }
    }
}

async fn purchase_order(keep: &StockKeep, cmd: PurchaseOrderCommand) -> Result<Value> {
    let purchasing = keep.purchase_orders();
    match cmd {
        PurchaseOrderCommand::List { status, supplier } => match (status, supplier) {
            (Some(status), _) => to_value(purchasing.by_status(status).await?),
            (None, Some(supplier)) => to_value(purchasing.by_supplier(supplier).await?),
            (None, None) => to_value(purchasing.get_all().await?),
        },
        PurchaseOrderCommand::Recent { limit } => match limit {
            Some(limit) => to_value(purchasing.recent(limit).await?),
            None => to_value(keep.recent_purchase_orders().await?),
        },
        PurchaseOrderCommand::Get { id } => to_value(purchasing.get(id).await?),
        PurchaseOrderCommand::Create(body) => to_value(purchasing.create(body.parse()?).await?),
        PurchaseOrderCommand::Update { id, body } => {
            to_value(purchasing.update(id, body.parse()?).await?)
        }
        PurchaseOrderCommand::Status { id, status } => {
            to_value(purchasing.update_status(id, status).await?)
        }
        PurchaseOrderCommand::Receive { id, body } => {
            let receipts: Vec<Receipt> = body.parse()?;
            to_value(purchasing.receive(id, &receipts).await?)
        }
        PurchaseOrderCommand::Notify { id } => {
            purchasing.notify_supplier(id).await?;
            Ok(json!({ "notified": id.to_string() }))
        }
        PurchaseOrderCommand::Delete { id } => {
            purchasing.delete(id).await?;
            Ok(deleted(id))
        }
    }
}

async fn transactions(keep: &StockKeep, args: TransactionArgs) -> Result<Value> {
    let ledger = keep.transactions();
    let mut rows = match (args.product, args.limit) {
        (Some(product), _) => ledger.by_product(product).await?,
        (None, Some(limit)) => ledger.recent(limit).await?,
        (None, None) => keep.recent_transactions().await?,
    };
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }
    to_value(rows)
}

async fn export(keep: &StockKeep, output: Option<&Path>) -> Result<Value> {
    let snapshot = keep.export().await?;
    let Some(path) = output else {
        return to_value(snapshot);
    };
    let text = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(json!({ "exported": path.display().to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    async fn exec(keep: &StockKeep, args: &[&str]) -> Result<Value> {
        let mut argv = vec!["stockkeep"];
        argv.extend_from_slice(args);
        run(keep, Cli::try_parse_from(argv)?.command).await
    }

    #[tokio::test]
    async fn create_and_list_through_commands() {
        let keep = StockKeep::in_memory();
        exec(&keep, &["category", "create", "--name", "Tools"]).await.unwrap();
        let product = exec(
            &keep,
            &[
                "product",
                "create",
                "--json",
                r#"{"sku":"HAM-1","name":"Hammer","category":1,"quantity":5,"minStockLevel":2,"price":9.5}"#,
            ],
        )
        .await
        .unwrap();
        assert_eq!(product["Id"], 1);
        assert_eq!(product["reservedQuantity"], 0);

        let order = exec(
            &keep,
            &[
                "order",
                "create",
                "--json",
                r#"{"customerName":"Acme","lineItems":[{"productId":1,"quantity":2}]}"#,
            ],
        )
        .await
        .unwrap();
        assert_eq!(order["status"], "Pending");

        let listed = exec(&keep, &["product", "get", "1"]).await.unwrap();
        assert_eq!(listed["reservedQuantity"], 2);
    }

    #[tokio::test]
    async fn adjust_records_ledger_row() {
        let keep = StockKeep::in_memory();
        exec(&keep, &["category", "create", "--name", "Tools"]).await.unwrap();
        exec(
            &keep,
            &[
                "product",
                "create",
                "--json",
                r#"{"sku":"N-1","name":"Nut","category":1,"quantity":10,"minStockLevel":0,"price":0.1}"#,
            ],
        )
        .await
        .unwrap();
        let adjusted = exec(&keep, &["product", "adjust", "1", "--add", "-4"]).await.unwrap();
        assert_eq!(adjusted["quantity"], 6);
        let rows = exec(&keep, &["transactions", "--product", "1"]).await.unwrap();
        assert_eq!(rows[0]["type"], "adjustment");
        assert_eq!(rows[0]["quantity"], -4);
    }

    #[tokio::test]
    async fn export_to_file_and_import_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("snapshot.json");
        let file = file.to_str().unwrap();

        let keep = StockKeep::in_memory();
        exec(&keep, &["category", "create", "--name", "Tools"]).await.unwrap();
        exec(&keep, &["export", "--output", file]).await.unwrap();

        let other = StockKeep::in_memory();
        let summary = exec(&other, &["import", file]).await.unwrap();
        assert_eq!(summary["imported"]["categories"], 1);
        assert_eq!(other.categories().get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_json_is_reported() {
        let keep = StockKeep::in_memory();
        let err = exec(&keep, &["supplier", "create", "--json", "{"]).await.unwrap_err();
        assert!(err.to_string().contains("invalid JSON body"));
    }
}
