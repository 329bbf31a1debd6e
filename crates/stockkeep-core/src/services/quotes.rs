//! Customer quotes

use crate::error::{EntityKind, StockError, StockResult};
use crate::numbering;
use crate::services::price_lines;
use crate::store::{next_id, Db};
use crate::types::{NewQuote, Product, Quote, QuoteId, QuotePatch, QuoteStatus, Totals};
use chrono::Utc;

/// Quote CRUD; quotes never touch stock
#[derive(Debug, Clone)]
pub struct QuoteService {
    db: Db,
    tax_rate: f64,
}

impl QuoteService {
    /// Create service over `db`
    #[inline]
    #[must_use]
    pub fn new(db: Db, tax_rate: f64) -> Self {
        Self { db, tax_rate }
    }

    /// All quotes
    pub async fn get_all(&self) -> StockResult<Vec<Quote>> {
        Ok(self.db.load().await?)
    }

    /// One quote
    pub async fn get(&self, id: QuoteId) -> StockResult<Quote> {
        let quotes: Vec<Quote> = self.db.load().await?;
        quotes
            .into_iter()
            .find(|q| q.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::Quote, id))
    }

    /// Price and store a quote
    pub async fn create(&self, input: NewQuote) -> StockResult<Quote> {
        if input.status == Some(QuoteStatus::Converted) {
            return Err(StockError::InvalidInput(
                "quotes become Converted only by conversion to a sales order".to_string(),
            ));
        }
        let _guard = self.db.write().await;
        let products: Vec<Product> = self.db.load().await?;
        let line_items = price_lines(&products, &input.line_items)?;
        let mut quotes: Vec<Quote> = self.db.load().await?;

        let now = Utc::now();
        let quote = Quote {
            id: next_id(&quotes)?,
            quote_number: numbering::quote_number(now),
            customer: input.customer,
            totals: Totals::compute(&line_items, self.tax_rate),
            line_items,
            status: input.status.unwrap_or(QuoteStatus::Draft),
            valid_until: input.valid_until,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        quotes.push(quote.clone());
        self.db.save(&quotes).await?;
        tracing::info!(id = %quote.id, number = %quote.quote_number, "created quote");
        Ok(quote)
    }

    /// Edit a quote that has not been converted
    pub async fn update(&self, id: QuoteId, patch: QuotePatch) -> StockResult<Quote> {
        let _guard = self.db.write().await;
        let products: Vec<Product> = self.db.load().await?;
        let mut quotes: Vec<Quote> = self.db.load().await?;
        let quote = quotes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::Quote, id))?;
        if quote.status == QuoteStatus::Converted {
            return Err(StockError::Conflict(
                "Converted quotes cannot be edited".to_string(),
            ));
        }

        if let Some(lines) = patch.line_items {
            quote.line_items = price_lines(&products, &lines)?;
            quote.totals = Totals::compute(&quote.line_items, self.tax_rate);
        }
        if let Some(customer) = patch.customer {
            quote.customer = customer;
        }
        if let Some(status) = patch.status {
            if status == QuoteStatus::Converted {
                return Err(StockError::invalid_transition(
                    EntityKind::Quote,
                    quote.status,
                    status,
                ));
            }
            quote.status = status;
        }
        if let Some(valid_until) = patch.valid_until {
            quote.valid_until = Some(valid_until);
        }
        if let Some(notes) = patch.notes {
            quote.notes = notes;
        }
        quote.updated_at = Utc::now();

        let updated = quote.clone();
        self.db.save(&quotes).await?;
        Ok(updated)
    }

    /// Remove a quote
    pub async fn delete(&self, id: QuoteId) -> StockResult<()> {
        let _guard = self.db.write().await;
        let mut quotes: Vec<Quote> = self.db.load().await?;
        let before = quotes.len();
        quotes.retain(|q| q.id != id);
        if quotes.len() == before {
            return Err(StockError::not_found(EntityKind::Quote, id));
        }
        self.db.save(&quotes).await?;
        tracing::info!(id = %id, "deleted quote");
        Ok(())
    }

    /// Move a quote to `status`
    ///
    /// Converted quotes stay converted, and only sales order conversion may
    /// mark a quote converted.
    pub async fn update_status(&self, id: QuoteId, status: QuoteStatus) -> StockResult<Quote> {
        let _guard = self.db.write().await;
        let mut quotes: Vec<Quote> = self.db.load().await?;
        let quote = quotes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| StockError::not_found(EntityKind::Quote, id))?;
        if quote.status == QuoteStatus::Converted || status == QuoteStatus::Converted {
            return Err(StockError::invalid_transition(
                EntityKind::Quote,
                quote.status,
                status,
            ));
        }
        quote.status = status;
        quote.updated_at = Utc::now();
        let updated = quote.clone();
        self.db.save(&quotes).await?;
        tracing::info!(id = %id, %status, "quote status changed");
        Ok(updated)
    }

    /// Quotes in one status
    pub async fn by_status(&self, status: QuoteStatus) -> StockResult<Vec<Quote>> {
        let mut quotes: Vec<Quote> = self.db.load().await?;
        quotes.retain(|q| q.status == status);
        Ok(quotes)
    }

    /// Quotes whose customer name contains `name`, ignoring case
    pub async fn by_customer(&self, name: &str) -> StockResult<Vec<Quote>> {
        let mut quotes: Vec<Quote> = self.db.load().await?;
        quotes.retain(|q| q.customer.name_matches(name));
        Ok(quotes)
    }
}
