//! Core types for StockKeep
//!
//! Defines the records held in each collection:
//! - Typed integer identifiers
//! - Products, categories and suppliers
//! - Quotes, sales orders and purchase orders with their line items
//! - Stock movement transactions
//!
//! Field names serialize in camelCase with an `Id` key, the layout of the
//! browser-storage blobs StockKeep imports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Raw numeric value
            #[inline]
            #[must_use]
            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

entity_id!(
    /// Product identifier
    ProductId
);
entity_id!(
    /// Category identifier
    CategoryId
);
entity_id!(
    /// Supplier identifier
    SupplierId
);
entity_id!(
    /// Stock transaction identifier
    TransactionId
);
entity_id!(
    /// Quote identifier
    QuoteId
);
entity_id!(
    /// Sales order identifier
    SalesOrderId
);
entity_id!(
    /// Purchase order identifier
    PurchaseOrderId
);

/// Enum with fixed wire labels, parsed case-insensitively
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire label
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        let valid: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        format!("invalid status '{}': must be one of {}", s, valid.join(", "))
                    })
            }
        }
    };
}

labelled_enum!(
    /// Quote lifecycle
    QuoteStatus {
        Draft => "Draft",
        Sent => "Sent",
        Accepted => "Accepted",
        Rejected => "Rejected",
        /// Turned into a sales order
        Converted => "Converted",
    }
);

labelled_enum!(
    /// Sales order lifecycle
    SalesOrderStatus {
        Pending => "Pending",
        Processing => "Processing",
        Fulfilled => "Fulfilled",
        Cancelled => "Cancelled",
    }
);

impl SalesOrderStatus {
    /// Open orders hold stock reservations
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

labelled_enum!(
    /// Purchase order lifecycle
    PurchaseOrderStatus {
        Draft => "draft",
        Submitted => "submitted",
        Approved => "approved",
        PartiallyReceived => "partially_received",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

impl PurchaseOrderStatus {
    /// No further changes allowed
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

labelled_enum!(
    /// Direction of a stock movement
    TransactionKind {
        /// Goods received
        StockIn => "in",
        /// Goods shipped
        StockOut => "out",
        /// Manual correction
        Adjustment => "adjustment",
    }
);

labelled_enum!(
    /// Shelf status derived from quantity and minimum stock level
    StockStatus {
        InStock => "In Stock",
        LowStock => "Low Stock",
        OutOfStock => "Out of Stock",
    }
);

/// Round a currency amount to cents
#[inline]
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Stocked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "Id")]
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: CategoryId,
    #[serde(default)]
    pub supplier: Option<SupplierId>,
    /// Units on hand
    pub quantity: u32,
    /// Units promised to open sales orders
    #[serde(default)]
    pub reserved_quantity: u32,
    pub min_stock_level: u32,
    pub price: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Units that can still be reserved
    #[inline]
    #[must_use]
    pub fn available(&self) -> u32 {
        self.quantity.saturating_sub(self.reserved_quantity)
    }

    /// Shelf status
    #[must_use]
    pub fn stock_status(&self) -> StockStatus {
        if self.quantity == 0 {
            StockStatus::OutOfStock
        } else if self.quantity <= self.min_stock_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// On-hand value at list price
    #[inline]
    #[must_use]
    pub fn stock_value(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Fields for creating a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category: CategoryId,
    #[serde(default)]
    pub supplier: Option<SupplierId>,
    pub quantity: u32,
    pub min_stock_level: u32,
    pub price: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub description: String,
}

/// Partial product update; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category: Option<CategoryId>,
    pub supplier: Option<SupplierId>,
    pub quantity: Option<u32>,
    pub min_stock_level: Option<u32>,
    pub price: Option<f64>,
    pub cost: Option<f64>,
    pub description: Option<String>,
}

/// Manual stock change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "quantity")]
pub enum StockAdjustment {
    /// Add (or with a negative delta, remove) units
    Add(i64),
    /// Replace the on-hand count
    Set(u32),
}

/// Product grouping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "Id")]
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Filled in when categories are listed
    #[serde(default)]
    pub product_count: usize,
}

/// Fields for creating a category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Partial category update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Default payment terms for new suppliers
pub const DEFAULT_PAYMENT_TERMS: &str = "Net 30";
/// Default lead time for new suppliers
pub const DEFAULT_LEAD_TIME_DAYS: u32 = 14;

/// Vendor of products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    #[serde(rename = "Id")]
    pub id: SupplierId,
    pub name: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub payment_terms: String,
    pub lead_time_days: u32,
    pub performance_rating: f64,
    pub minimum_order_quantity: u32,
    #[serde(default)]
    pub notes: String,
}

/// Fields for creating a supplier; unset terms fall back to defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSupplier {
    pub name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub payment_terms: Option<String>,
    pub lead_time_days: Option<u32>,
    pub performance_rating: Option<f64>,
    pub minimum_order_quantity: Option<u32>,
    pub notes: Option<String>,
}

/// Partial supplier update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupplierPatch {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub payment_terms: Option<String>,
    pub lead_time_days: Option<u32>,
    pub performance_rating: Option<f64>,
    pub minimum_order_quantity: Option<u32>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Requested order line; the unit price defaults to the product's list price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<f64>,
}

impl OrderLine {
    /// Line at list price
    #[inline]
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: None,
        }
    }

    /// Override the unit price
    #[inline]
    #[must_use]
    pub fn at_price(mut self, unit_price: f64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}

/// Priced order line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
}

impl LineItem {
    /// Price a line
    #[inline]
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32, unit_price: f64) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
            total: round_cents(unit_price * f64::from(quantity)),
        }
    }
}

impl From<LineItem> for OrderLine {
    fn from(item: LineItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: Some(item.unit_price),
        }
    }
}

/// Order money totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

impl Totals {
    /// Sum line totals and apply tax, rounding each figure to cents
    #[must_use]
    pub fn compute(items: &[LineItem], tax_rate: f64) -> Self {
        let subtotal: f64 = items.iter().map(|item| item.total).sum();
        let tax = subtotal * tax_rate;
        Self {
            subtotal: round_cents(subtotal),
            tax: round_cents(tax),
            total: round_cents(subtotal + tax),
        }
    }
}

/// Customer contact block shared by quotes and sales orders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub billing_address: String,
}

impl Customer {
    /// Customer with just a name
    #[inline]
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            customer_name: name.into(),
            ..Self::default()
        }
    }

    /// Case-insensitive substring match on the name
    #[must_use]
    pub fn name_matches(&self, needle: &str) -> bool {
        self.customer_name
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

/// Price quote for a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(rename = "Id")]
    pub id: QuoteId,
    pub quote_number: String,
    #[serde(flatten)]
    pub customer: Customer,
    pub line_items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: Totals,
    pub status: QuoteStatus,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a quote
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewQuote {
    #[serde(flatten)]
    pub customer: Customer,
    pub line_items: Vec<OrderLine>,
    pub status: Option<QuoteStatus>,
    pub valid_until: Option<NaiveDate>,
    pub notes: String,
}

/// Partial quote update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuotePatch {
    pub customer: Option<Customer>,
    pub line_items: Option<Vec<OrderLine>>,
    pub status: Option<QuoteStatus>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Customer order that reserves stock until fulfilled or cancelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrder {
    #[serde(rename = "Id")]
    pub id: SalesOrderId,
    pub order_number: String,
    #[serde(flatten)]
    pub customer: Customer,
    pub line_items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: Totals,
    pub status: SalesOrderStatus,
    #[serde(default)]
    pub quote_id: Option<QuoteId>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a sales order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSalesOrder {
    #[serde(flatten)]
    pub customer: Customer,
    pub line_items: Vec<OrderLine>,
    pub status: Option<SalesOrderStatus>,
    pub quote_id: Option<QuoteId>,
    pub notes: String,
}

/// Partial sales order update; status changes go through `update_status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalesOrderPatch {
    pub customer: Option<Customer>,
    pub line_items: Option<Vec<OrderLine>>,
    pub notes: Option<String>,
}

/// Purchase order line with receiving progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
    #[serde(default)]
    pub received_quantity: u32,
}

impl PurchaseLine {
    /// Price a line
    #[inline]
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32, unit_price: f64) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
            total: round_cents(unit_price * f64::from(quantity)),
            received_quantity: 0,
        }
    }

    /// Units still expected from the supplier
    #[inline]
    #[must_use]
    pub fn outstanding(&self) -> u32 {
        self.quantity.saturating_sub(self.received_quantity)
    }
}

/// Order placed with a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    #[serde(rename = "Id")]
    pub id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: SupplierId,
    pub order_date: NaiveDate,
    #[serde(default)]
    pub expected_delivery_date: Option<NaiveDate>,
    pub status: PurchaseOrderStatus,
    #[serde(default)]
    pub notes: String,
    pub line_items: Vec<PurchaseLine>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// True once any units have been received
    #[must_use]
    pub fn has_receipts(&self) -> bool {
        self.line_items.iter().any(|line| line.received_quantity > 0)
    }

    /// True when nothing is outstanding
    #[must_use]
    pub fn fully_received(&self) -> bool {
        self.line_items.iter().all(|line| line.outstanding() == 0)
    }
}

/// Requested purchase line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineInput {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Fields for creating a purchase order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchaseOrder {
    pub supplier_id: SupplierId,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub expected_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<PurchaseOrderStatus>,
    #[serde(default)]
    pub notes: String,
    pub line_items: Vec<PurchaseLineInput>,
}

/// Partial purchase order update; `Id`, `poNumber` and `createdAt` never change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PurchaseOrderPatch {
    pub supplier_id: Option<SupplierId>,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub line_items: Option<Vec<PurchaseLineInput>>,
}

/// Units received against one purchase line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub product_id: ProductId,
    pub quantity: u32,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Recorded stock movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "Id")]
    pub id: TransactionId,
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Signed change in on-hand units
    pub quantity: i64,
    /// On-hand units after the movement
    pub balance: u32,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub date: DateTime<Utc>,
}

/// Fields for recording a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub quantity: i64,
    pub balance: u32,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: String,
}
