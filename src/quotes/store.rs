//! Storage abstraction for regions, quotes, and line items.
//!
//! `PgQuoteStore` (see `queries`) backs production; `MemoryQuoteStore`
//! (see `memory`) backs tests and database-less development runs.

use async_trait::async_trait;
use uuid::Uuid;

use super::models::{Quote, QuoteLineItem, QuoteStatus, Region, UnknownValue};

/// Storage failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(#[from] UnknownValue),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn list_regions(&self) -> StoreResult<Vec<Region>>;
    async fn fetch_region(&self, code: &str) -> StoreResult<Option<Region>>;
    async fn upsert_region(&self, region: &Region) -> StoreResult<()>;

    /// Insert a quote together with its initial line items.
    async fn insert_quote(&self, quote: &Quote, items: &[QuoteLineItem]) -> StoreResult<()>;
    async fn fetch_quote(&self, id: Uuid) -> StoreResult<Option<Quote>>;
    /// Newest first, optionally filtered by status.
    async fn list_quotes(&self, status: Option<QuoteStatus>) -> StoreResult<Vec<Quote>>;
    /// Overwrite every mutable column of the quote row.
    async fn update_quote(&self, quote: &Quote) -> StoreResult<()>;
    /// Delete a quote and its line items; `false` when it did not exist.
    async fn delete_quote(&self, id: Uuid) -> StoreResult<bool>;

    /// Items for a quote ordered by position.
    async fn list_line_items(&self, quote_id: Uuid) -> StoreResult<Vec<QuoteLineItem>>;
    async fn insert_line_item(&self, item: &QuoteLineItem) -> StoreResult<()>;
    async fn update_line_item(&self, item: &QuoteLineItem) -> StoreResult<()>;
    async fn delete_line_item(&self, quote_id: Uuid, item_id: Uuid) -> StoreResult<bool>;

    /// Persist recomputed totals for the quote and the given items together.
    async fn save_totals(&self, quote: &Quote, items: &[QuoteLineItem]) -> StoreResult<()>;
}
