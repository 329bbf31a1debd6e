//! Stock movement ledger

use crate::error::{EntityKind, StockError, StockResult};
use crate::inventory::Movement;
use crate::store::{next_id, Db};
use crate::types::{NewTransaction, ProductId, Transaction, TransactionId, TransactionKind};
use chrono::{DateTime, Utc};

/// Append ledger rows for committed movements
pub(crate) fn stage_movements(
    ledger: &mut Vec<Transaction>,
    movements: &[Movement],
    kind: TransactionKind,
    reference: Option<&str>,
    notes: &str,
    now: DateTime<Utc>,
) -> StockResult<()> {
    for movement in movements {
        let id = next_id(ledger)?;
        ledger.push(Transaction {
            id,
            product_id: movement.product_id,
            kind,
            quantity: movement.change,
            balance: movement.balance,
            reference: reference.map(str::to_string),
            notes: notes.to_string(),
            date: now,
        });
    }
    Ok(())
}

fn newest_first(rows: &mut [Transaction]) {
    rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
}

/// Read and append access to the ledger
#[derive(Debug, Clone)]
pub struct TransactionService {
    db: Db,
}

impl TransactionService {
    /// Create service over `db`
    #[inline]
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// All transactions, newest first
    pub async fn get_all(&self) -> StockResult<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self.db.load().await?;
        newest_first(&mut rows);
        Ok(rows)
    }

    /// One transaction
    pub async fn get(&self, id: TransactionId) -> StockResult<Transaction> {
        let rows: Vec<Transaction> = self.db.load().await?;
        rows.into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::Transaction, id))
    }

    /// Transactions for one product, newest first
    pub async fn by_product(&self, product: ProductId) -> StockResult<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self.db.load().await?;
        rows.retain(|t| t.product_id == product);
        newest_first(&mut rows);
        Ok(rows)
    }

    /// Record a movement entered by hand; the date is stamped now
    pub async fn create(&self, input: NewTransaction) -> StockResult<Transaction> {
        let _guard = self.db.write().await;
        let mut rows: Vec<Transaction> = self.db.load().await?;
        let transaction = Transaction {
            id: next_id(&rows)?,
            product_id: input.product_id,
            kind: input.kind,
            quantity: input.quantity,
            balance: input.balance,
            reference: input.reference,
            notes: input.notes,
            date: Utc::now(),
        };
        rows.push(transaction.clone());
        self.db.save(&rows).await?;
        tracing::info!(id = %transaction.id, product = %transaction.product_id, "recorded transaction");
        Ok(transaction)
    }

    /// Latest `limit` transactions
    pub async fn recent(&self, limit: usize) -> StockResult<Vec<Transaction>> {
        let mut rows = self.get_all().await?;
        rows.truncate(limit);
        Ok(rows)
    }

    /// Transactions dated within `[start, end]`
    pub async fn by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StockResult<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self.db.load().await?;
        rows.retain(|t| t.date >= start && t.date <= end);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input(product: u32, quantity: i64) -> NewTransaction {
        NewTransaction {
            product_id: ProductId(product),
            kind: TransactionKind::Adjustment,
            quantity,
            balance: 10,
            reference: None,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_date() {
        let service = TransactionService::new(Db::in_memory());
        let first = service.create(input(1, 5)).await.unwrap();
        let second = service.create(input(2, -1)).await.unwrap();
        assert_eq!(first.id, TransactionId(1));
        assert_eq!(second.id, TransactionId(2));
        assert!(second.date >= first.date);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let service = TransactionService::new(Db::in_memory());
        for product in 1..=3 {
            service.create(input(product, 1)).await.unwrap();
        }
        let rows = service.get_all().await.unwrap();
        assert_eq!(rows[0].id, TransactionId(3));
        assert_eq!(service.recent(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn filters_by_product_and_range() {
        let service = TransactionService::new(Db::in_memory());
        service.create(input(1, 1)).await.unwrap();
        service.create(input(2, 1)).await.unwrap();
        service.create(input(1, 2)).await.unwrap();

        let for_one = service.by_product(ProductId(1)).await.unwrap();
        assert_eq!(for_one.len(), 2);
        assert!(for_one.iter().all(|t| t.product_id == ProductId(1)));

        let now = Utc::now();
        let all = service
            .by_date_range(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        let none = service
            .by_date_range(now - Duration::hours(2), now - Duration::hours(1))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn stage_movements_appends_rows() {
        let mut ledger = Vec::new();
        let movements = [
            Movement { product_id: ProductId(1), change: -2, balance: 8 },
            Movement { product_id: ProductId(2), change: -1, balance: 0 },
        ];
        stage_movements(
            &mut ledger,
            &movements,
            TransactionKind::StockOut,
            Some("SO-000001-001"),
            "",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[1].id, TransactionId(2));
        assert_eq!(ledger[1].reference.as_deref(), Some("SO-000001-001"));
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let service = TransactionService::new(Db::in_memory());
        assert!(service.get(TransactionId(4)).await.unwrap_err().is_not_found());
    }
}
