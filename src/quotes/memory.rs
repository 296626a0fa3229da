//! In-memory quote store for tests and runs without `DATABASE_URL`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::models::{Quote, QuoteLineItem, QuoteStatus, Region};
use super::store::{QuoteStore, StoreError, StoreResult};

#[derive(Default)]
struct MemoryState {
    regions: BTreeMap<String, Region>,
    quotes: HashMap<Uuid, Quote>,
    items: HashMap<Uuid, Vec<QuoteLineItem>>,
}

/// `QuoteStore` backed by process memory. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryQuoteStore {
    state: RwLock<MemoryState>,
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the given regions.
    pub fn with_regions(regions: impl IntoIterator<Item = Region>) -> Self {
        let mut state = MemoryState::default();
        state
            .regions
            .extend(regions.into_iter().map(|region| (region.code.clone(), region)));
        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl QuoteStore for MemoryQuoteStore {
    async fn list_regions(&self) -> StoreResult<Vec<Region>> {
        Ok(self.read()?.regions.values().cloned().collect())
    }

    async fn fetch_region(&self, code: &str) -> StoreResult<Option<Region>> {
        Ok(self.read()?.regions.get(code).cloned())
    }

    async fn upsert_region(&self, region: &Region) -> StoreResult<()> {
        self.write()?
            .regions
            .insert(region.code.clone(), region.clone());
        Ok(())
    }

    async fn insert_quote(&self, quote: &Quote, items: &[QuoteLineItem]) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.quotes.contains_key(&quote.id) {
            return Err(StoreError::Conflict);
        }
        state.quotes.insert(quote.id, quote.clone());
        state.items.insert(quote.id, items.to_vec());
        Ok(())
    }

    async fn fetch_quote(&self, id: Uuid) -> StoreResult<Option<Quote>> {
        Ok(self.read()?.quotes.get(&id).cloned())
    }

    async fn list_quotes(&self, status: Option<QuoteStatus>) -> StoreResult<Vec<Quote>> {
        let state = self.read()?;
        let mut quotes: Vec<Quote> = state
            .quotes
            .values()
            .filter(|quote| status.map_or(true, |s| quote.status == s))
            .cloned()
            .collect();
        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quotes)
    }

    async fn update_quote(&self, quote: &Quote) -> StoreResult<()> {
        let mut state = self.write()?;
        let stored = state.quotes.get_mut(&quote.id).ok_or(StoreError::NotFound)?;
        *stored = quote.clone();
        Ok(())
    }

    async fn delete_quote(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.write()?;
        state.items.remove(&id);
        Ok(state.quotes.remove(&id).is_some())
    }

    async fn list_line_items(&self, quote_id: Uuid) -> StoreResult<Vec<QuoteLineItem>> {
        let state = self.read()?;
        let mut items = state.items.get(&quote_id).cloned().unwrap_or_default();
        items.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(items)
    }

    async fn insert_line_item(&self, item: &QuoteLineItem) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.quotes.contains_key(&item.quote_id) {
            return Err(StoreError::NotFound);
        }
        let items = state.items.entry(item.quote_id).or_default();
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(StoreError::Conflict);
        }
        items.push(item.clone());
        Ok(())
    }

    async fn update_line_item(&self, item: &QuoteLineItem) -> StoreResult<()> {
        let mut state = self.write()?;
        let stored = state
            .items
            .get_mut(&item.quote_id)
            .and_then(|items| items.iter_mut().find(|existing| existing.id == item.id))
            .ok_or(StoreError::NotFound)?;
        *stored = item.clone();
        Ok(())
    }

    async fn delete_line_item(&self, quote_id: Uuid, item_id: Uuid) -> StoreResult<bool> {
        let mut state = self.write()?;
        let Some(items) = state.items.get_mut(&quote_id) else {
            return Ok(false);
        };
        let before = items.len();
        items.retain(|item| item.id != item_id);
        Ok(items.len() != before)
    }

    async fn save_totals(&self, quote: &Quote, items: &[QuoteLineItem]) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.quotes.contains_key(&quote.id) {
            return Err(StoreError::NotFound);
        }

        if let Some(stored_items) = state.items.get_mut(&quote.id) {
            for item in items {
                if let Some(stored) = stored_items.iter_mut().find(|s| s.id == item.id) {
                    stored.total_amount = item.total_amount;
                }
            }
        }
        state.quotes.insert(quote.id, quote.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::models::{LineItemKind, NewLineItem};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn quote() -> Quote {
        Quote::draft("US-CA".into(), "ADU".into(), "USD".into(), dec!(1.2), Utc::now())
    }

    fn line(quote_id: Uuid, position: i32) -> QuoteLineItem {
        QuoteLineItem::from_new(
            quote_id,
            position,
            NewLineItem::new(LineItemKind::Base, dec!(1), dec!(10)),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_fetch_quote_with_items() {
        let store = MemoryQuoteStore::new();
        let quote = quote();
        let items = vec![line(quote.id, 1), line(quote.id, 0)];

        store.insert_quote(&quote, &items).await.unwrap();

        assert_eq!(store.fetch_quote(quote.id).await.unwrap(), Some(quote.clone()));
        let listed = store.list_line_items(quote.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].position, 0);
    }

    #[tokio::test]
    async fn test_duplicate_quote_insert_conflicts() {
        let store = MemoryQuoteStore::new();
        let quote = quote();
        store.insert_quote(&quote, &[]).await.unwrap();

        let err = store.insert_quote(&quote, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn test_delete_quote_cascades_items() {
        let store = MemoryQuoteStore::new();
        let quote = quote();
        store.insert_quote(&quote, &[line(quote.id, 0)]).await.unwrap();

        assert!(store.delete_quote(quote.id).await.unwrap());
        assert!(store.list_line_items(quote.id).await.unwrap().is_empty());
        assert!(!store.delete_quote(quote.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_line_item_for_missing_quote_is_rejected() {
        let store = MemoryQuoteStore::new();
        let err = store.insert_line_item(&line(Uuid::new_v4(), 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_update_missing_quote_is_not_found() {
        let store = MemoryQuoteStore::new();
        let err = store.update_quote(&quote()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_list_quotes_filters_and_orders_newest_first() {
        let store = MemoryQuoteStore::new();
        let older = Quote {
            created_at: Utc::now() - Duration::hours(1),
            ..quote()
        };
        let mut newer = quote();
        newer.status = QuoteStatus::Sent;
        store.insert_quote(&older, &[]).await.unwrap();
        store.insert_quote(&newer, &[]).await.unwrap();

        let all = store.list_quotes(None).await.unwrap();
        assert_eq!(all.iter().map(|q| q.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let sent = store.list_quotes(Some(QuoteStatus::Sent)).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, newer.id);
    }

    #[tokio::test]
    async fn test_regions_listed_by_code() {
        let store = MemoryQuoteStore::with_regions([
            Region {
                code: "US-WA".into(),
                name: "Washington".into(),
                currency_code: "USD".into(),
                regional_multiplier: dec!(1.1),
            },
            Region {
                code: "CA-BC".into(),
                name: "British Columbia".into(),
                currency_code: "CAD".into(),
                regional_multiplier: dec!(1.25),
            },
        ]);

        let codes: Vec<String> = store
            .list_regions()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.code)
            .collect();
        assert_eq!(codes, vec!["CA-BC", "US-WA"]);
    }
}
