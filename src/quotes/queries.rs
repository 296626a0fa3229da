//! Database queries for the quote store.
//!
//! Runtime-checked sqlx queries against the schema in `migrations/`.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::models::{Quote, QuoteLineItem, QuoteLineItemRow, QuoteRow, QuoteStatus, Region};
use super::store::{QuoteStore, StoreError, StoreResult};

const QUOTE_COLUMNS: &str = r#"
    id, region_code, title, status, currency_code, regional_multiplier,
    subtotal_amount, tax_amount, discount_amount, allowance_amount,
    adjustment_amount, total_amount, version, parent_id,
    sent_at, viewed_at, responded_at, created_at, updated_at
"#;

const LINE_ITEM_COLUMNS: &str = r#"
    id, quote_id, kind, description, quantity, unit_cost,
    apply_region_multiplier, total_amount, metadata, position,
    created_at, updated_at
"#;

/// Get all regions ordered by code
pub async fn get_regions(pool: &PgPool) -> StoreResult<Vec<Region>> {
    let regions = sqlx::query_as::<_, Region>(
        r#"
        SELECT code, name, currency_code, regional_multiplier
        FROM quotes_region
        ORDER BY code
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(regions)
}

/// Get a region by code
pub async fn get_region(pool: &PgPool, code: &str) -> StoreResult<Option<Region>> {
    let region = sqlx::query_as::<_, Region>(
        r#"
        SELECT code, name, currency_code, regional_multiplier
        FROM quotes_region
        WHERE code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(region)
}

/// Insert or replace a region
pub async fn upsert_region(pool: &PgPool, region: &Region) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO quotes_region (code, name, currency_code, regional_multiplier)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (code) DO UPDATE
        SET name = EXCLUDED.name,
            currency_code = EXCLUDED.currency_code,
            regional_multiplier = EXCLUDED.regional_multiplier
        "#,
    )
    .bind(&region.code)
    .bind(&region.name)
    .bind(&region.currency_code)
    .bind(region.regional_multiplier)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a quote by id
pub async fn get_quote(pool: &PgPool, id: Uuid) -> StoreResult<Option<Quote>> {
    let row = sqlx::query_as::<_, QuoteRow>(&format!(
        "SELECT {QUOTE_COLUMNS} FROM quotes_quote WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Quote::try_from).transpose()?)
}

/// List quotes newest first, optionally filtered by status
pub async fn get_quotes(pool: &PgPool, status: Option<QuoteStatus>) -> StoreResult<Vec<Quote>> {
    let rows = sqlx::query_as::<_, QuoteRow>(&format!(
        r#"
        SELECT {QUOTE_COLUMNS}
        FROM quotes_quote
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY created_at DESC
        "#
    ))
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    let quotes = rows
        .into_iter()
        .map(Quote::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(quotes)
}

async fn insert_quote_row(conn: &mut PgConnection, quote: &Quote) -> StoreResult<()> {
    sqlx::query(&format!(
        r#"
        INSERT INTO quotes_quote ({QUOTE_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19)
        "#
    ))
    .bind(quote.id)
    .bind(&quote.region_code)
    .bind(&quote.title)
    .bind(quote.status.as_str())
    .bind(&quote.currency_code)
    .bind(quote.regional_multiplier)
    .bind(quote.totals.subtotal_amount)
    .bind(quote.totals.tax_amount)
    .bind(quote.totals.discount_amount)
    .bind(quote.totals.allowance_amount)
    .bind(quote.totals.adjustment_amount)
    .bind(quote.totals.total_amount)
    .bind(quote.version)
    .bind(quote.parent_id)
    .bind(quote.sent_at)
    .bind(quote.viewed_at)
    .bind(quote.responded_at)
    .bind(quote.created_at)
    .bind(quote.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

async fn insert_line_item_row(conn: &mut PgConnection, item: &QuoteLineItem) -> StoreResult<()> {
    sqlx::query(&format!(
        r#"
        INSERT INTO quotes_quotelineitem ({LINE_ITEM_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#
    ))
    .bind(item.id)
    .bind(item.quote_id)
    .bind(item.kind.as_str())
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.unit_cost)
    .bind(item.apply_region_multiplier)
    .bind(item.total_amount)
    .bind(&item.metadata)
    .bind(item.position)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

async fn update_quote_row(conn: &mut PgConnection, quote: &Quote) -> StoreResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE quotes_quote
        SET title = $2,
            status = $3,
            currency_code = $4,
            regional_multiplier = $5,
            subtotal_amount = $6,
            tax_amount = $7,
            discount_amount = $8,
            allowance_amount = $9,
            adjustment_amount = $10,
            total_amount = $11,
            sent_at = $12,
            viewed_at = $13,
            responded_at = $14,
            updated_at = $15
        WHERE id = $1
        "#,
    )
    .bind(quote.id)
    .bind(&quote.title)
    .bind(quote.status.as_str())
    .bind(&quote.currency_code)
    .bind(quote.regional_multiplier)
    .bind(quote.totals.subtotal_amount)
    .bind(quote.totals.tax_amount)
    .bind(quote.totals.discount_amount)
    .bind(quote.totals.allowance_amount)
    .bind(quote.totals.adjustment_amount)
    .bind(quote.totals.total_amount)
    .bind(quote.sent_at)
    .bind(quote.viewed_at)
    .bind(quote.responded_at)
    .bind(quote.updated_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Insert a quote and its items in one transaction
pub async fn insert_quote(pool: &PgPool, quote: &Quote, items: &[QuoteLineItem]) -> StoreResult<()> {
    let mut tx = pool.begin().await?;
    insert_quote_row(&mut tx, quote).await?;
    for item in items {
        insert_line_item_row(&mut tx, item).await?;
    }
    tx.commit().await?;

    Ok(())
}

/// Overwrite a quote row
pub async fn update_quote(pool: &PgPool, quote: &Quote) -> StoreResult<()> {
    let mut conn = pool.acquire().await?;
    match update_quote_row(&mut conn, quote).await? {
        0 => Err(StoreError::NotFound),
        _ => Ok(()),
    }
}

/// Delete a quote; line items go with it via ON DELETE CASCADE
pub async fn delete_quote(pool: &PgPool, id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM quotes_quote WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Get line items for a quote in display order
pub async fn get_line_items(pool: &PgPool, quote_id: Uuid) -> StoreResult<Vec<QuoteLineItem>> {
    let rows = sqlx::query_as::<_, QuoteLineItemRow>(&format!(
        r#"
        SELECT {LINE_ITEM_COLUMNS}
        FROM quotes_quotelineitem
        WHERE quote_id = $1
        ORDER BY position, created_at
        "#
    ))
    .bind(quote_id)
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(QuoteLineItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Insert a single line item
pub async fn insert_line_item(pool: &PgPool, item: &QuoteLineItem) -> StoreResult<()> {
    let mut conn = pool.acquire().await?;
    insert_line_item_row(&mut conn, item).await
}

/// Overwrite a line item row
pub async fn update_line_item(pool: &PgPool, item: &QuoteLineItem) -> StoreResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE quotes_quotelineitem
        SET kind = $3,
            description = $4,
            quantity = $5,
            unit_cost = $6,
            apply_region_multiplier = $7,
            total_amount = $8,
            metadata = $9,
            position = $10,
            updated_at = $11
        WHERE id = $1 AND quote_id = $2
        "#,
    )
    .bind(item.id)
    .bind(item.quote_id)
    .bind(item.kind.as_str())
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.unit_cost)
    .bind(item.apply_region_multiplier)
    .bind(item.total_amount)
    .bind(&item.metadata)
    .bind(item.position)
    .bind(item.updated_at)
    .execute(pool)
    .await?;

    match result.rows_affected() {
        0 => Err(StoreError::NotFound),
        _ => Ok(()),
    }
}

/// Delete a line item from a quote
pub async fn delete_line_item(pool: &PgPool, quote_id: Uuid, item_id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM quotes_quotelineitem WHERE id = $1 AND quote_id = $2")
        .bind(item_id)
        .bind(quote_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Write recomputed line totals and quote totals in one transaction
pub async fn save_totals(pool: &PgPool, quote: &Quote, items: &[QuoteLineItem]) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    for item in items {
        sqlx::query(
            r#"
            UPDATE quotes_quotelineitem
            SET total_amount = $3
            WHERE id = $1 AND quote_id = $2
            "#,
        )
        .bind(item.id)
        .bind(item.quote_id)
        .bind(item.total_amount)
        .execute(&mut *tx)
        .await?;
    }

    if update_quote_row(&mut tx, quote).await? == 0 {
        return Err(StoreError::NotFound);
    }
    tx.commit().await?;

    Ok(())
}

/// PostgreSQL-backed quote store
#[derive(Clone)]
pub struct PgQuoteStore {
    pool: PgPool,
}

impl PgQuoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuoteStore for PgQuoteStore {
    async fn list_regions(&self) -> StoreResult<Vec<Region>> {
        get_regions(&self.pool).await
    }

    async fn fetch_region(&self, code: &str) -> StoreResult<Option<Region>> {
        get_region(&self.pool, code).await
    }

    async fn upsert_region(&self, region: &Region) -> StoreResult<()> {
        upsert_region(&self.pool, region).await
    }

    async fn insert_quote(&self, quote: &Quote, items: &[QuoteLineItem]) -> StoreResult<()> {
        insert_quote(&self.pool, quote, items).await
    }

    async fn fetch_quote(&self, id: Uuid) -> StoreResult<Option<Quote>> {
        get_quote(&self.pool, id).await
    }

    async fn list_quotes(&self, status: Option<QuoteStatus>) -> StoreResult<Vec<Quote>> {
        get_quotes(&self.pool, status).await
    }

    async fn update_quote(&self, quote: &Quote) -> StoreResult<()> {
        update_quote(&self.pool, quote).await
    }

    async fn delete_quote(&self, id: Uuid) -> StoreResult<bool> {
        delete_quote(&self.pool, id).await
    }

    async fn list_line_items(&self, quote_id: Uuid) -> StoreResult<Vec<QuoteLineItem>> {
        get_line_items(&self.pool, quote_id).await
    }

    async fn insert_line_item(&self, item: &QuoteLineItem) -> StoreResult<()> {
        insert_line_item(&self.pool, item).await
    }

    async fn update_line_item(&self, item: &QuoteLineItem) -> StoreResult<()> {
        update_line_item(&self.pool, item).await
    }

    async fn delete_line_item(&self, quote_id: Uuid, item_id: Uuid) -> StoreResult<bool> {
        delete_line_item(&self.pool, quote_id, item_id).await
    }

    async fn save_totals(&self, quote: &Quote, items: &[QuoteLineItem]) -> StoreResult<()> {
        save_totals(&self.pool, quote, items).await
    }
}
