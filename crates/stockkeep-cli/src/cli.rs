//! Command-line grammar

use crate::logging::CliLoggingArgs;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use stockkeep_core::{
    CategoryId, ProductId, PurchaseOrderId, PurchaseOrderStatus, QuoteId, QuoteStatus,
    SalesOrderId, SalesOrderStatus, SupplierId,
};

/// Inventory, quoting and order management
#[derive(Debug, Parser)]
#[command(name = "stockkeep", version, about)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory; implies file storage
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(flatten)]
    pub logging: CliLoggingArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Products and stock levels
    #[command(subcommand)]
    Product(ProductCommand),
    /// Product categories
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Suppliers
    #[command(subcommand)]
    Supplier(SupplierCommand),
    /// Customer quotes
    #[command(subcommand)]
    Quote(QuoteCommand),
    /// Sales orders
    #[command(subcommand)]
    Order(OrderCommand),
    /// Purchase orders
    #[command(subcommand)]
    Po(PurchaseOrderCommand),
    /// Stock movement ledger
    Transactions(TransactionArgs),
    /// Inventory overview
    Dashboard,
    /// Write every collection as one JSON document
    Export {
        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace every collection from an exported document
    Import {
        /// Snapshot file
        file: PathBuf,
    },
}

/// JSON body, inline or `@path`
#[derive(Debug, Clone, Args)]
pub struct JsonBody {
    /// JSON object, or @file to read it from a file
    #[arg(long)]
    pub json: String,
}

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// List products
    List {
        #[arg(long)]
        category: Option<CategoryId>,
        #[arg(long)]
        supplier: Option<SupplierId>,
    },
    /// Show one product
    Get { id: ProductId },
    /// Add a product
    Create(JsonBody),
    /// Change product fields
    Update {
        id: ProductId,
        #[command(flatten)]
        body: JsonBody,
    },
    /// Remove a product
    Delete { id: ProductId },
    /// Products at or below their reorder point
    LowStock {
        #[arg(long)]
        threshold: Option<u32>,
    },
    /// Add to or overwrite the on-hand count
    Adjust {
        id: ProductId,
        /// Units to add (negative to remove)
        #[arg(
            long,
            allow_negative_numbers = true,
            conflicts_with = "set",
            required_unless_present = "set"
        )]
        add: Option<i64>,
        /// New on-hand count
        #[arg(long)]
        set: Option<u32>,
        #[arg(long, default_value = "")]
        notes: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// List categories with product counts
    List,
    /// Show one category
    Get { id: CategoryId },
    /// Add a category
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Change category fields
    Update {
        id: CategoryId,
        #[command(flatten)]
        body: JsonBody,
    },
    /// Remove an empty category
    Delete { id: CategoryId },
}

#[derive(Debug, Subcommand)]
pub enum SupplierCommand {
    /// List suppliers
    List,
    /// Show one supplier
    Get { id: SupplierId },
    /// Add a supplier
    Create(JsonBody),
    /// Change supplier fields
    Update {
        id: SupplierId,
        #[command(flatten)]
        body: JsonBody,
    },
    /// Remove a supplier without products
    Delete { id: SupplierId },
    /// Products sourced from a supplier
    Products { id: SupplierId },
}

#[derive(Debug, Subcommand)]
pub enum QuoteCommand {
    /// List quotes
    List {
        #[arg(long)]
        status: Option<QuoteStatus>,
        #[arg(long)]
        customer: Option<String>,
    },
    /// Show one quote
    Get { id: QuoteId },
    /// Create a quote
    Create(JsonBody),
    /// Change quote fields
    Update {
        id: QuoteId,
        #[command(flatten)]
        body: JsonBody,
    },
    /// Change quote status
    Status { id: QuoteId, status: QuoteStatus },
    /// Remove a quote
    Delete { id: QuoteId },
    /// Turn an accepted quote into a sales order
    Convert { id: QuoteId },
}

#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    /// List sales orders
    List {
        #[arg(long)]
        status: Option<SalesOrderStatus>,
        #[arg(long)]
        customer: Option<String>,
    },
    /// Show one sales order
    Get { id: SalesOrderId },
    /// Create a sales order, reserving its stock
    Create(JsonBody),
    /// Change order fields
    Update {
        id: SalesOrderId,
        #[command(flatten)]
        body: JsonBody,
    },
    /// Change order status
    Status { id: SalesOrderId, status: SalesOrderStatus },
    /// Ship the order
    Fulfill { id: SalesOrderId },
    /// Remove an order, releasing open reservations
    Delete { id: SalesOrderId },
}

#[derive(Debug, Subcommand)]
pub enum PurchaseOrderCommand {
    /// List purchase orders
    List {
        #[arg(long)]
        status: Option<PurchaseOrderStatus>,
        #[arg(long)]
        supplier: Option<SupplierId>,
    },
    /// Latest purchase orders
    Recent {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one purchase order
    Get { id: PurchaseOrderId },
    /// Create a purchase order
    Create(JsonBody),
    /// Change purchase order fields
    Update {
        id: PurchaseOrderId,
        #[command(flatten)]
        body: JsonBody,
    },
    /// Change status and notify the supplier
    Status { id: PurchaseOrderId, status: PurchaseOrderStatus },
    /// Book received goods; body is a list of {productId, quantity}
    Receive {
        id: PurchaseOrderId,
        #[command(flatten)]
        body: JsonBody,
    },
    /// Send the current status to the supplier again
    Notify { id: PurchaseOrderId },
    /// Remove a purchase order
    Delete { id: PurchaseOrderId },
}

/// Ledger filters
#[derive(Debug, Args)]
pub struct TransactionArgs {
    #[arg(long)]
    pub product: Option<ProductId>,
    /// Show at most this many, newest first
    #[arg(long)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn grammar_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_status_and_ids() {
        let cli =
            Cli::try_parse_from(["stockkeep", "po", "status", "3", "partially_received"]).unwrap();
        match cli.command {
            Command::Po(PurchaseOrderCommand::Status { id, status }) => {
                assert_eq!(id, PurchaseOrderId(3));
                assert_eq!(status, PurchaseOrderStatus::PartiallyReceived);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn adjust_needs_exactly_one_mode() {
        assert!(Cli::try_parse_from(["stockkeep", "product", "adjust", "1"]).is_err());
        assert!(Cli::try_parse_from([
            "stockkeep", "product", "adjust", "1", "--add", "-3", "--set", "4"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["stockkeep", "product", "adjust", "1", "--add", "-3"]).is_ok());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stockkeep", "dashboard", "--data-dir", "/tmp/sk", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/sk")));
        assert!(cli.logging.log_level.is_some());
    }
}
