//! Error types for StockKeep
//!
//! Errors are layered the same way the services are:
//! - [`StoreError`] for the key-value persistence layer
//! - [`InventoryError`] for stock bookkeeping on a single product
//! - [`StockError`] for everything a service call can return

use crate::types::ProductId;
use std::fmt;

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying I/O failed
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Collection could not be serialized
    #[error("failed to encode collection {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Stored blob exists but does not parse
    #[error("stored collection {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Collection key is not a valid storage name
    #[error("invalid collection key: {0}")]
    InvalidKey(String),

    /// Every identifier in a collection is taken
    #[error("no identifiers left in collection {0}")]
    IdsExhausted(String),

    /// Imported data breaks a stock invariant
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Stock bookkeeping errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    /// Not enough unreserved stock to satisfy a reservation
    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductId,
        requested: u32,
        available: u32,
    },

    /// Not enough on-hand stock to ship
    #[error("cannot fulfill {requested} units of product {product}: only {on_hand} on hand")]
    InsufficientOnHand {
        product: ProductId,
        requested: u32,
        on_hand: u32,
    },

    /// Adjustment would leave less stock than is reserved
    #[error("product {product} has {reserved} units reserved; quantity cannot drop to {requested}")]
    BelowReserved {
        product: ProductId,
        requested: u32,
        reserved: u32,
    },

    /// Line item quantity must be positive
    #[error("invalid quantity {quantity} for product {product}")]
    InvalidQuantity { product: ProductId, quantity: u32 },

    /// Line item references an unknown product
    #[error("product {0} not found")]
    UnknownProduct(ProductId),
}

/// Entity kinds, used in not-found and conflict messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Product,
    Category,
    Supplier,
    Transaction,
    Quote,
    SalesOrder,
    PurchaseOrder,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Product => "Product",
            Self::Category => "Category",
            Self::Supplier => "Supplier",
            Self::Transaction => "Transaction",
            Self::Quote => "Quote",
            Self::SalesOrder => "Sales order",
            Self::PurchaseOrder => "Purchase order",
        };
        f.write_str(name)
    }
}

/// Supplier notification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// Notice lacks a required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Supplier email is not an address
    #[error("invalid email address format: {0}")]
    InvalidEmail(String),

    /// Delivery channel refused the notice
    #[error("notification not delivered: {0}")]
    Delivery(String),
}

/// Main service error type
#[derive(Debug, thiserror::Error)]
pub enum StockError {
    /// Record does not exist
    #[error("{kind} not found")]
    NotFound { kind: EntityKind, id: u32 },

    /// Operation conflicts with related records
    #[error("{0}")]
    Conflict(String),

    /// Status change not allowed from the current status
    #[error("cannot change {kind} status from {from} to {to}")]
    InvalidTransition {
        kind: EntityKind,
        from: String,
        to: String,
    },

    /// Caller supplied an unusable value
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Stock bookkeeping failed
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Persistence failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Supplier notification failed
    #[error(transparent)]
    Notification(#[from] NotifyError),
}

impl StockError {
    /// Build a not-found error
    #[inline]
    #[must_use]
    pub fn not_found(kind: EntityKind, id: impl Into<u32>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Build an invalid-transition error
    #[inline]
    #[must_use]
    pub fn invalid_transition(
        kind: EntityKind,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            kind,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Check if the error is a missing record
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if the error was caused by business rules rather than storage
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::InvalidTransition { .. } | Self::Inventory(_)
        )
    }

    /// Check if the error came from the persistence layer
    #[inline]
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Result alias used by all services
pub type StockResult<T> = Result<T, StockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = StockError::not_found(EntityKind::SalesOrder, 7u32);
        assert_eq!(err.to_string(), "Sales order not found");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn inventory_errors_are_conflicts() {
        let err: StockError = InventoryError::InsufficientStock {
            product: ProductId(3),
            requested: 5,
            available: 2,
        }
        .into();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("requested 5, available 2"));
    }

    #[test]
    fn transition_display() {
        let err = StockError::invalid_transition(EntityKind::PurchaseOrder, "completed", "draft");
        assert_eq!(
            err.to_string(),
            "cannot change Purchase order status from completed to draft"
        );
    }

    #[test]
    fn store_errors_classified() {
        let err: StockError =
            StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk")).into();
        assert!(err.is_storage());
        assert!(!err.is_conflict());
    }
}
