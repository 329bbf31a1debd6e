//! Supplier notifications for purchase order status changes
//!
//! The purchase order service builds a [`PurchaseOrderNotice`] after each
//! status change and hands it to a [`SupplierNotifier`]. Delivery failures
//! are logged by the caller and never undo the status change.

pub use crate::error::NotifyError;
use crate::types::{PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus, Supplier};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Payload sent to a supplier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderNotice {
    pub purchase_order_id: PurchaseOrderId,
    pub po_number: String,
    pub status: PurchaseOrderStatus,
    pub supplier_email: String,
    pub supplier_name: String,
    pub order_date: NaiveDate,
    pub expected_delivery_date: Option<NaiveDate>,
}

impl PurchaseOrderNotice {
    /// Notice for `order`, or `None` when the supplier has no email
    #[must_use]
    pub fn for_order(order: &PurchaseOrder, supplier: &Supplier) -> Option<Self> {
        let email = supplier.email.trim();
        if email.is_empty() {
            return None;
        }
        Some(Self {
            purchase_order_id: order.id,
            po_number: order.po_number.clone(),
            status: order.status,
            supplier_email: email.to_string(),
            supplier_name: supplier.name.clone(),
            order_date: order.order_date,
            expected_delivery_date: order.expected_delivery_date,
        })
    }

    /// Check required fields and the email shape
    ///
    /// # Errors
    /// `MissingField` or `InvalidEmail`
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.supplier_email.is_empty() {
            return Err(NotifyError::MissingField("supplierEmail"));
        }
        if self.supplier_name.trim().is_empty() {
            return Err(NotifyError::MissingField("supplierName"));
        }
        if !looks_like_email(&self.supplier_email) {
            return Err(NotifyError::InvalidEmail(self.supplier_email.clone()));
        }
        Ok(())
    }

    /// One-line subject for the notice
    #[must_use]
    pub fn subject(&self) -> String {
        format!("Purchase order {} is now {}", self.po_number, self.status)
    }
}

/// `local@domain.tld` with no whitespace and a single `@`
fn looks_like_email(address: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(address))
}

/// Delivery channel for supplier notices
#[async_trait::async_trait]
pub trait SupplierNotifier: Send + Sync + std::fmt::Debug {
    /// Deliver one notice
    async fn notify(&self, notice: &PurchaseOrderNotice) -> Result<(), NotifyError>;
}

/// Notifier that validates the notice and writes it to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait::async_trait]
impl SupplierNotifier for TracingNotifier {
    async fn notify(&self, notice: &PurchaseOrderNotice) -> Result<(), NotifyError> {
        notice.validate()?;
        tracing::info!(
            po = %notice.po_number,
            status = %notice.status,
            to = %notice.supplier_email,
            "{}",
            notice.subject()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notice(email: &str) -> PurchaseOrderNotice {
        PurchaseOrderNotice {
            purchase_order_id: PurchaseOrderId(1),
            po_number: "PO-2026-0001".to_string(),
            status: PurchaseOrderStatus::Submitted,
            supplier_email: email.to_string(),
            supplier_name: "Acme Supply".to_string(),
            order_date: Utc::now().date_naive(),
            expected_delivery_date: None,
        }
    }

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("orders@acme.com"));
        assert!(!looks_like_email("orders@acme"));
        assert!(!looks_like_email("@acme.com"));
        assert!(!looks_like_email("a b@acme.com"));
        assert!(!looks_like_email("a@b@acme.com"));
        assert!(looks_like_email("a@b.c."));
        assert!(looks_like_email("first.last@mail.acme.co.uk"));
        assert!(!looks_like_email("orders@.com"));
    }

    #[tokio::test]
    async fn tracing_notifier_validates() {
        let notifier = TracingNotifier;
        assert!(notifier.notify(&notice("orders@acme.com")).await.is_ok());
        assert_eq!(
            notifier.notify(&notice("not-an-address")).await,
            Err(NotifyError::InvalidEmail("not-an-address".to_string()))
        );
    }

    #[test]
    fn subject_names_status() {
        assert_eq!(
            notice("orders@acme.com").subject(),
            "Purchase order PO-2026-0001 is now submitted"
        );
    }
}
