//! Quote service functions with store access.
//!
//! These functions load quotes through the store and region cache, run the
//! totals engine, apply lifecycle transitions, and persist the result.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::AppCache;

use super::models::{
    LineItemChanges, NewLineItem, NewQuote, Quote, QuoteAction, QuoteLineItem, QuoteStatus,
    Region, TransitionError,
};
use super::store::{QuoteStore, StoreError};

/// Quote service error types
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("quote {0} not found")]
    QuoteNotFound(Uuid),

    #[error("line item {item_id} not found on quote {quote_id}")]
    LineItemNotFound { quote_id: Uuid, item_id: Uuid },

    #[error("region '{0}' not found")]
    RegionNotFound(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("quote {id} is {status}; line items can only change while it is a draft")]
    NotEditable { id: Uuid, status: QuoteStatus },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Exclusive magnitude bounds matching the NUMERIC columns in `migrations/`.
const MULTIPLIER_LIMIT: Decimal = dec!(10000);
const LINE_INPUT_LIMIT: Decimal = dec!(10000000000);
const AMOUNT_LIMIT: Decimal = dec!(1000000000000);
/// Decimal places stored for multipliers, quantities, and unit costs.
const INPUT_SCALE: u32 = 4;

/// A quote with its line items in display order.
#[derive(Debug, Clone)]
pub struct QuoteDetail {
    pub quote: Quote,
    pub items: Vec<QuoteLineItem>,
}

/// Orchestrates the store, region cache, totals engine, and lifecycle.
#[derive(Clone)]
pub struct QuoteService {
    store: Arc<dyn QuoteStore>,
    cache: AppCache,
}

impl QuoteService {
    pub fn new(store: Arc<dyn QuoteStore>, cache: AppCache) -> Self {
        Self { store, cache }
    }

    // ==================== regions ====================

    /// Look up a region, cache first.
    pub async fn region(&self, code: &str) -> Result<Arc<Region>, QuoteError> {
        let code = normalize_region_code(code);

        if let Some(cached) = self.cache.regions.get(&code).await {
            debug!("Cache HIT for region: {}", code);
            return Ok(cached);
        }

        debug!("Cache MISS for region: {}", code);
        let region = self
            .store
            .fetch_region(&code)
            .await?
            .ok_or_else(|| QuoteError::RegionNotFound(code.clone()))?;
        // A concurrent save_region may have cached a newer copy meanwhile
        let entry = self.cache.regions.entry(code).or_insert(Arc::new(region)).await;
        Ok(entry.into_value())
    }

    pub async fn list_regions(&self) -> Result<Vec<Region>, QuoteError> {
        Ok(self.store.list_regions().await?)
    }

    /// Create or replace a region and cache the saved copy.
    pub async fn save_region(&self, mut region: Region) -> Result<Region, QuoteError> {
        region.code = normalize_region_code(&region.code);
        region.currency_code = region.currency_code.trim().to_ascii_uppercase();
        if region.code.is_empty() {
            return Err(QuoteError::Validation("region code is required".to_string()));
        }
        validate_currency(&region.currency_code)?;
        validate_multiplier(region.regional_multiplier)?;

        self.store.upsert_region(&region).await?;
        self.cache
            .regions
            .insert(region.code.clone(), Arc::new(region.clone()))
            .await;
        info!(region = %region.code, "Region saved");
        Ok(region)
    }

    // ==================== quotes ====================

    /// Create a draft quote, filling currency and multiplier from the region
    /// when the caller leaves them out.
    pub async fn create_quote(&self, new: NewQuote) -> Result<QuoteDetail, QuoteError> {
        let region = self.region(&new.region_code).await?;

        let currency_code = match new.currency_code {
            Some(code) => code.trim().to_ascii_uppercase(),
            None => region.currency_code.clone(),
        };
        let regional_multiplier = new.regional_multiplier.unwrap_or(region.regional_multiplier);
        validate_currency(&currency_code)?;
        validate_multiplier(regional_multiplier)?;
        for item in &new.items {
            validate_line_item(item)?;
        }

        let now = Utc::now();
        let mut quote = Quote::draft(
            region.code.clone(),
            new.title.trim().to_string(),
            currency_code,
            regional_multiplier,
            now,
        );
        let mut items: Vec<QuoteLineItem> = new
            .items
            .into_iter()
            .zip(0..)
            .map(|(item, position)| QuoteLineItem::from_new(quote.id, position, item, now))
            .collect();
        apply_totals(&mut quote, &mut items)?;

        self.store.insert_quote(&quote, &items).await?;
        info!(
            quote_id = %quote.id,
            region = %quote.region_code,
            total = %quote.totals.total_amount,
            "Quote created"
        );

        Ok(QuoteDetail { quote, items })
    }

    pub async fn get_quote(&self, id: Uuid) -> Result<QuoteDetail, QuoteError> {
        let quote = self.load_quote(id).await?;
        let items = self.store.list_line_items(id).await?;
        Ok(QuoteDetail { quote, items })
    }

    pub async fn list_quotes(&self, status: Option<QuoteStatus>) -> Result<Vec<Quote>, QuoteError> {
        Ok(self.store.list_quotes(status).await?)
    }

    pub async fn delete_quote(&self, id: Uuid) -> Result<(), QuoteError> {
        if !self.store.delete_quote(id).await? {
            return Err(QuoteError::QuoteNotFound(id));
        }
        info!(quote_id = %id, "Quote deleted");
        Ok(())
    }

    // ==================== line items ====================

    pub async fn add_line_item(&self, quote_id: Uuid, new: NewLineItem) -> Result<QuoteDetail, QuoteError> {
        validate_line_item(&new)?;
        let mut quote = self.load_editable_quote(quote_id).await?;
        let mut items = self.store.list_line_items(quote_id).await?;

        let position = items.iter().map(|item| item.position + 1).max().unwrap_or(0);
        items.push(QuoteLineItem::from_new(quote_id, position, new, Utc::now()));
        apply_totals(&mut quote, &mut items)?;

        let added = &items[items.len() - 1];
        self.store.insert_line_item(added).await?;
        debug!(quote_id = %quote_id, item_id = %added.id, kind = %added.kind, "Line item added");

        self.save_totals(quote, items).await
    }

    pub async fn update_line_item(
        &self,
        quote_id: Uuid,
        item_id: Uuid,
        changes: LineItemChanges,
    ) -> Result<QuoteDetail, QuoteError> {
        let mut quote = self.load_editable_quote(quote_id).await?;
        let mut items = self.store.list_line_items(quote_id).await?;

        let index = items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(QuoteError::LineItemNotFound { quote_id, item_id })?;
        items[index].apply_changes(changes, Utc::now());
        let item = &items[index];
        validate_line_item_fields(item.quantity, item.unit_cost, &item.metadata)?;
        apply_totals(&mut quote, &mut items)?;

        self.store.update_line_item(&items[index]).await?;
        debug!(quote_id = %quote_id, item_id = %item_id, "Line item updated");

        self.save_totals(quote, items).await
    }

    pub async fn remove_line_item(&self, quote_id: Uuid, item_id: Uuid) -> Result<QuoteDetail, QuoteError> {
        let mut quote = self.load_editable_quote(quote_id).await?;
        let mut items = self.store.list_line_items(quote_id).await?;

        let before = items.len();
        items.retain(|item| item.id != item_id);
        if items.len() == before {
            return Err(QuoteError::LineItemNotFound { quote_id, item_id });
        }
        apply_totals(&mut quote, &mut items)?;

        if !self.store.delete_line_item(quote_id, item_id).await? {
            return Err(QuoteError::LineItemNotFound { quote_id, item_id });
        }
        debug!(quote_id = %quote_id, item_id = %item_id, "Line item removed");

        self.save_totals(quote, items).await
    }

    // ==================== totals ====================

    /// Recompute and persist the quote's totals.
    ///
    /// With `items` the rollup is computed from that explicit set instead of
    /// the persisted items; only the quote row is written in that case.
    pub async fn recalculate_totals(
        &self,
        quote_id: Uuid,
        items: Option<Vec<NewLineItem>>,
    ) -> Result<QuoteDetail, QuoteError> {
        let quote = self.load_quote(quote_id).await?;

        match items {
            None => {
                let items = self.store.list_line_items(quote_id).await?;
                self.recompute_and_save(quote, items).await
            }
            Some(explicit) => {
                for item in &explicit {
                    validate_line_item(item)?;
                }
                let now = Utc::now();
                let mut quote = quote;
                let mut items: Vec<QuoteLineItem> = explicit
                    .into_iter()
                    .zip(0..)
                    .map(|(item, position)| QuoteLineItem::from_new(quote_id, position, item, now))
                    .collect();
                apply_totals(&mut quote, &mut items)?;
                quote.updated_at = now;
                self.store.update_quote(&quote).await?;
                info!(
                    quote_id = %quote_id,
                    total = %quote.totals.total_amount,
                    "Quote totals recalculated from explicit items"
                );
                Ok(QuoteDetail { quote, items })
            }
        }
    }

    async fn recompute_and_save(
        &self,
        mut quote: Quote,
        mut items: Vec<QuoteLineItem>,
    ) -> Result<QuoteDetail, QuoteError> {
        apply_totals(&mut quote, &mut items)?;
        self.save_totals(quote, items).await
    }

    /// Persist totals already computed by `apply_totals`.
    async fn save_totals(&self, mut quote: Quote, items: Vec<QuoteLineItem>) -> Result<QuoteDetail, QuoteError> {
        quote.updated_at = Utc::now();
        self.store.save_totals(&quote, &items).await?;
        debug!(
            quote_id = %quote.id,
            total = %quote.totals.total_amount,
            items = items.len(),
            "Quote totals recalculated"
        );
        Ok(QuoteDetail { quote, items })
    }

    // ==================== lifecycle ====================

    /// Send the quote. Totals are recomputed before the transition.
    pub async fn mark_sent(&self, id: Uuid) -> Result<QuoteDetail, QuoteError> {
        let quote = self.load_quote(id).await?;
        quote.status.transition(QuoteAction::Send)?;

        let items = self.store.list_line_items(id).await?;
        let detail = self.recompute_and_save(quote, items).await?;
        let quote = self.transition(detail.quote, QuoteAction::Send).await?;
        Ok(QuoteDetail {
            quote,
            items: detail.items,
        })
    }

    pub async fn mark_viewed(&self, id: Uuid) -> Result<Quote, QuoteError> {
        let quote = self.load_quote(id).await?;
        self.transition(quote, QuoteAction::View).await
    }

    pub async fn mark_accepted(&self, id: Uuid) -> Result<Quote, QuoteError> {
        let quote = self.load_quote(id).await?;
        self.transition(quote, QuoteAction::Accept).await
    }

    pub async fn mark_declined(&self, id: Uuid) -> Result<Quote, QuoteError> {
        let quote = self.load_quote(id).await?;
        self.transition(quote, QuoteAction::Decline).await
    }

    async fn transition(&self, mut quote: Quote, action: QuoteAction) -> Result<Quote, QuoteError> {
        let from = quote.status;
        if quote.apply(action, Utc::now())? {
            self.store.update_quote(&quote).await?;
            info!(quote_id = %quote.id, %from, to = %quote.status, "Quote transitioned");
        }
        Ok(quote)
    }

    /// Spawn a draft revision carrying copies of every line item.
    pub async fn create_revision(&self, id: Uuid) -> Result<QuoteDetail, QuoteError> {
        let parent = self.load_quote(id).await?;
        let parent_items = self.store.list_line_items(id).await?;

        let now = Utc::now();
        let mut revision = parent.revise(now);
        let mut items: Vec<QuoteLineItem> = parent_items
            .iter()
            .map(|item| item.copy_to(revision.id, now))
            .collect();
        apply_totals(&mut revision, &mut items)?;

        self.store.insert_quote(&revision, &items).await?;
        info!(
            quote_id = %revision.id,
            parent_id = %parent.id,
            version = revision.version,
            "Quote revision created"
        );

        Ok(QuoteDetail {
            quote: revision,
            items,
        })
    }

    async fn load_quote(&self, id: Uuid) -> Result<Quote, QuoteError> {
        self.store
            .fetch_quote(id)
            .await?
            .ok_or(QuoteError::QuoteNotFound(id))
    }

    async fn load_editable_quote(&self, id: Uuid) -> Result<Quote, QuoteError> {
        let quote = self.load_quote(id).await?;
        if !quote.is_editable() {
            return Err(QuoteError::NotEditable {
                id,
                status: quote.status,
            });
        }
        Ok(quote)
    }
}

pub fn normalize_region_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn validate_currency(code: &str) -> Result<(), QuoteError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(QuoteError::Validation(format!(
            "currency code '{}' must be three letters",
            code
        )))
    }
}

fn validate_multiplier(multiplier: Decimal) -> Result<(), QuoteError> {
    if multiplier <= Decimal::ZERO {
        return Err(QuoteError::Validation(format!(
            "regional multiplier must be positive, got {}",
            multiplier
        )));
    }
    validate_stored_decimal("regional multiplier", multiplier, MULTIPLIER_LIMIT)
}

fn validate_line_item(item: &NewLineItem) -> Result<(), QuoteError> {
    validate_line_item_fields(item.quantity, item.unit_cost, &item.metadata)
}

fn validate_line_item_fields(
    quantity: Decimal,
    unit_cost: Decimal,
    metadata: &serde_json::Value,
) -> Result<(), QuoteError> {
    if quantity < Decimal::ZERO {
        return Err(QuoteError::Validation(format!(
            "quantity must not be negative, got {}",
            quantity
        )));
    }
    validate_stored_decimal("quantity", quantity, LINE_INPUT_LIMIT)?;
    validate_stored_decimal("unit cost", unit_cost, LINE_INPUT_LIMIT)?;
    if !metadata.is_object() {
        return Err(QuoteError::Validation(
            "metadata must be a JSON object".to_string(),
        ));
    }
    Ok(())
}

/// Reject values the database would round or refuse, so totals computed here
/// match what a later recompute of the stored row produces.
fn validate_stored_decimal(field: &str, value: Decimal, limit: Decimal) -> Result<(), QuoteError> {
    if value.normalize().scale() > INPUT_SCALE {
        return Err(QuoteError::Validation(format!(
            "{} allows at most {} decimal places, got {}",
            field, INPUT_SCALE, value
        )));
    }
    if value.abs() >= limit {
        return Err(QuoteError::Validation(format!(
            "{} must be below {} in magnitude, got {}",
            field, limit, value
        )));
    }
    Ok(())
}

/// Run the totals engine over `items` and check every amount fits storage.
fn apply_totals(quote: &mut Quote, items: &mut [QuoteLineItem]) -> Result<Decimal, QuoteError> {
    let total = quote
        .recalculate_totals(items)
        .ok_or_else(|| QuoteError::Validation("quote amounts overflow".to_string()))?;

    let totals = &quote.totals;
    let rollup = [
        totals.subtotal_amount,
        totals.tax_amount,
        totals.discount_amount,
        totals.allowance_amount,
        totals.adjustment_amount,
        totals.total_amount,
    ];
    let oversized = rollup
        .into_iter()
        .chain(items.iter().map(|item| item.total_amount))
        .find(|amount| amount.abs() >= AMOUNT_LIMIT);
    if let Some(amount) = oversized {
        return Err(QuoteError::Validation(format!(
            "amount {} exceeds the largest storable amount",
            amount
        )));
    }

    Ok(total)
}
