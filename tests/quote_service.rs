use std::sync::Arc;

use greenbuild_quotes::cache::AppCache;
use greenbuild_quotes::quotes::models::{
    LineItemChanges, LineItemKind, NewLineItem, NewQuote, QuoteStatus, Region,
};
use greenbuild_quotes::quotes::{MemoryQuoteStore, QuoteError, QuoteService, QuoteStore};
use rust_decimal_macros::dec;
use serde_json::json;

fn california() -> Region {
    Region {
        code: "US-CA".to_string(),
        name: "California".to_string(),
        currency_code: "USD".to_string(),
        regional_multiplier: dec!(1.20),
    }
}

fn service() -> (QuoteService, Arc<MemoryQuoteStore>) {
    let store = Arc::new(MemoryQuoteStore::with_regions([california()]));
    let service = QuoteService::new(store.clone(), AppCache::default());
    (service, store)
}

fn base_and_allowance() -> NewQuote {
    NewQuote {
        region_code: "us-ca".to_string(),
        title: "Passive house shell".to_string(),
        items: vec![
            NewLineItem::new(LineItemKind::Base, dec!(2), dec!(100)),
            NewLineItem::new(LineItemKind::Allowance, dec!(1), dec!(50)).without_multiplier(),
        ],
        ..Default::default()
    }
}

#[tokio::test]
async fn create_quote_applies_region_defaults_and_rolls_up_totals() {
    let (service, _) = service();

    let detail = service.create_quote(base_and_allowance()).await.unwrap();
    let quote = &detail.quote;

    assert_eq!(quote.region_code, "US-CA");
    assert_eq!(quote.currency_code, "USD");
    assert_eq!(quote.regional_multiplier, dec!(1.20));
    assert_eq!(quote.status, QuoteStatus::Draft);
    assert_eq!(quote.totals.subtotal_amount, dec!(240.00));
    assert_eq!(quote.totals.allowance_amount, dec!(50.00));
    assert_eq!(quote.totals.tax_amount, dec!(0));
    assert_eq!(quote.totals.discount_amount, dec!(0));
    assert_eq!(quote.totals.total_amount, dec!(290.00));
    assert_eq!(detail.items[0].total_amount, dec!(240.00));
    assert_eq!(detail.items[1].total_amount, dec!(50.00));
}

#[tokio::test]
async fn create_quote_honours_explicit_currency_and_multiplier() {
    let (service, _) = service();

    let detail = service
        .create_quote(NewQuote {
            currency_code: Some("cad".to_string()),
            regional_multiplier: Some(dec!(1.5)),
            ..base_and_allowance()
        })
        .await
        .unwrap();

    assert_eq!(detail.quote.currency_code, "CAD");
    assert_eq!(detail.quote.totals.subtotal_amount, dec!(300.00));
    assert_eq!(detail.quote.totals.total_amount, dec!(350.00));
}

#[tokio::test]
async fn create_quote_without_known_region_fails() {
    let (service, _) = service();

    let err = service
        .create_quote(NewQuote {
            region_code: "MARS-1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, QuoteError::RegionNotFound(code) if code == "MARS-1"));
}

#[tokio::test]
async fn empty_quote_has_zero_totals() {
    let (service, _) = service();

    let detail = service
        .create_quote(NewQuote {
            region_code: "US-CA".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(detail.items.is_empty());
    assert_eq!(detail.quote.totals.total_amount, dec!(0));
    assert_eq!(detail.quote.totals.total_amount.to_string(), "0.00");
}

#[tokio::test]
async fn line_item_edits_recompute_and_persist_totals() {
    let (service, store) = service();
    let created = service.create_quote(base_and_allowance()).await.unwrap();
    let quote_id = created.quote.id;

    let added = service
        .add_line_item(
            quote_id,
            NewLineItem::new(LineItemKind::Option, dec!(1), dec!(10))
                .with_metadata(json!({"tax_amount": "15.00", "discount_amount": "5.00"})),
        )
        .await
        .unwrap();
    // 290 + 12 option + 15 tax - 5 discount
    assert_eq!(added.quote.totals.total_amount, dec!(312.00));
    assert_eq!(added.items.last().unwrap().position, 2);

    let option_id = added.items.last().unwrap().id;
    let updated = service
        .update_line_item(
            quote_id,
            option_id,
            LineItemChanges {
                apply_region_multiplier: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.quote.totals.subtotal_amount, dec!(250.00));
    assert_eq!(updated.quote.totals.total_amount, dec!(310.00));

    let removed = service.remove_line_item(quote_id, option_id).await.unwrap();
    assert_eq!(removed.quote.totals.total_amount, dec!(290.00));

    let stored = store.fetch_quote(quote_id).await.unwrap().unwrap();
    assert_eq!(stored.totals, removed.quote.totals);
}

#[tokio::test]
async fn recalculate_is_idempotent() {
    let (service, _) = service();
    let created = service.create_quote(base_and_allowance()).await.unwrap();

    let first = service.recalculate_totals(created.quote.id, None).await.unwrap();
    let second = service.recalculate_totals(created.quote.id, None).await.unwrap();

    assert_eq!(first.quote.totals, second.quote.totals);
    assert_eq!(first.quote.totals, created.quote.totals);
}

#[tokio::test]
async fn recalculate_with_explicit_items_persists_quote_totals_only() {
    let (service, store) = service();
    let created = service.create_quote(base_and_allowance()).await.unwrap();
    let quote_id = created.quote.id;

    let detail = service
        .recalculate_totals(
            quote_id,
            Some(vec![NewLineItem::new(LineItemKind::Adjustment, dec!(1), dec!(-20)).without_multiplier()]),
        )
        .await
        .unwrap();

    assert_eq!(detail.quote.totals.adjustment_amount, dec!(-20.00));
    assert_eq!(detail.quote.totals.total_amount, dec!(-20.00));

    let stored = store.fetch_quote(quote_id).await.unwrap().unwrap();
    assert_eq!(stored.totals.total_amount, dec!(-20.00));
    assert_eq!(store.list_line_items(quote_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn sending_recomputes_before_transition() {
    let (service, store) = service();
    let created = service.create_quote(base_and_allowance()).await.unwrap();
    let quote_id = created.quote.id;

    // Drift the stored totals out from under the engine
    let mut drifted = created.quote.clone();
    drifted.totals.total_amount = dec!(1);
    store.update_quote(&drifted).await.unwrap();

    let sent = service.mark_sent(quote_id).await.unwrap();

    assert_eq!(sent.quote.status, QuoteStatus::Sent);
    assert!(sent.quote.sent_at.is_some());
    assert_eq!(sent.quote.totals.total_amount, dec!(290.00));
    let stored = store.fetch_quote(quote_id).await.unwrap().unwrap();
    assert_eq!(stored.status, QuoteStatus::Sent);
    assert_eq!(stored.totals.total_amount, dec!(290.00));
}

#[tokio::test]
async fn full_lifecycle_and_terminal_states() {
    let (service, _) = service();
    let id = service.create_quote(base_and_allowance()).await.unwrap().quote.id;

    service.mark_sent(id).await.unwrap();
    let viewed = service.mark_viewed(id).await.unwrap();
    assert_eq!(viewed.status, QuoteStatus::Viewed);
    let accepted = service.mark_accepted(id).await.unwrap();
    assert_eq!(accepted.status, QuoteStatus::Accepted);
    assert!(accepted.responded_at.is_some());

    let err = service.mark_declined(id).await.unwrap_err();
    assert!(matches!(err, QuoteError::InvalidTransition(_)));
    let err = service.mark_sent(id).await.unwrap_err();
    assert!(matches!(err, QuoteError::InvalidTransition(_)));
}

#[tokio::test]
async fn draft_cannot_be_accepted() {
    let (service, _) = service();
    let id = service.create_quote(base_and_allowance()).await.unwrap().quote.id;

    let err = service.mark_accepted(id).await.unwrap_err();

    assert_eq!(err.to_string(), "cannot accept a quote that is draft");
}

#[tokio::test]
async fn sent_quote_items_are_locked() {
    let (service, _) = service();
    let created = service.create_quote(base_and_allowance()).await.unwrap();
    service.mark_sent(created.quote.id).await.unwrap();

    let err = service
        .add_line_item(created.quote.id, NewLineItem::new(LineItemKind::Base, dec!(1), dec!(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, QuoteError::NotEditable { status: QuoteStatus::Sent, .. }));
}

#[tokio::test]
async fn revision_copies_items_and_leaves_parent_alone() {
    let (service, store) = service();
    let created = service.create_quote(base_and_allowance()).await.unwrap();
    let parent_id = created.quote.id;
    service.mark_sent(parent_id).await.unwrap();
    service.mark_declined(parent_id).await.unwrap();

    let revision = service.create_revision(parent_id).await.unwrap();

    assert_ne!(revision.quote.id, parent_id);
    assert_eq!(revision.quote.parent_id, Some(parent_id));
    assert_eq!(revision.quote.version, 2);
    assert_eq!(revision.quote.status, QuoteStatus::Draft);
    assert_eq!(revision.quote.totals, created.quote.totals);
    assert_eq!(revision.items.len(), 2);
    assert!(revision.items.iter().all(|item| item.quote_id == revision.quote.id));

    let parent = store.fetch_quote(parent_id).await.unwrap().unwrap();
    assert_eq!(parent.status, QuoteStatus::Declined);
    assert_eq!(store.list_line_items(parent_id).await.unwrap().len(), 2);

    // The revision is editable even though the parent was terminal
    let edited = service
        .add_line_item(revision.quote.id, NewLineItem::new(LineItemKind::Base, dec!(1), dec!(10)))
        .await
        .unwrap();
    assert_eq!(edited.quote.totals.total_amount, dec!(302.00));
}

#[tokio::test]
async fn delete_quote_cascades_and_reports_missing() {
    let (service, store) = service();
    let id = service.create_quote(base_and_allowance()).await.unwrap().quote.id;

    service.delete_quote(id).await.unwrap();

    assert!(store.list_line_items(id).await.unwrap().is_empty());
    let err = service.delete_quote(id).await.unwrap_err();
    assert!(matches!(err, QuoteError::QuoteNotFound(missing) if missing == id));
}

#[tokio::test]
async fn saving_region_refreshes_cached_defaults() {
    let (service, _) = service();
    // Prime the cache with the original multiplier
    assert_eq!(service.region("US-CA").await.unwrap().regional_multiplier, dec!(1.20));

    service
        .save_region(Region {
            regional_multiplier: dec!(1.40),
            ..california()
        })
        .await
        .unwrap();

    let detail = service.create_quote(base_and_allowance()).await.unwrap();
    assert_eq!(detail.quote.regional_multiplier, dec!(1.40));
    assert_eq!(detail.quote.totals.subtotal_amount, dec!(280.00));
}

#[tokio::test]
async fn invalid_region_is_rejected() {
    let (service, _) = service();

    let err = service
        .save_region(Region {
            currency_code: "DOLLARS".to_string(),
            ..california()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, QuoteError::Validation(_)));
}

#[tokio::test]
async fn huge_line_items_fail_validation_instead_of_overflowing() {
    let (service, _) = service();
    let huge = rust_decimal::Decimal::from_scientific("1e20").unwrap();

    let err = service
        .create_quote(NewQuote {
            items: vec![NewLineItem::new(LineItemKind::Base, huge, huge)],
            ..base_and_allowance()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, QuoteError::Validation(_)));
}

#[tokio::test]
async fn rejected_item_edit_leaves_stored_quote_untouched() {
    let (service, store) = service();
    let created = service.create_quote(base_and_allowance()).await.unwrap();
    let quote_id = created.quote.id;
    let base_id = created.items[0].id;

    let err = service
        .update_line_item(
            quote_id,
            base_id,
            LineItemChanges {
                quantity: Some(dec!(9999999999)),
                unit_cost: Some(dec!(9999999999)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QuoteError::Validation(_)));

    let items = store.list_line_items(quote_id).await.unwrap();
    assert_eq!(items[0].quantity, dec!(2));
    let stored = store.fetch_quote(quote_id).await.unwrap().unwrap();
    assert_eq!(stored.totals.total_amount, dec!(290.00));
}

#[tokio::test]
async fn saved_region_is_cached_immediately() {
    let store = Arc::new(MemoryQuoteStore::with_regions([california()]));
    let cache = AppCache::default();
    let service = QuoteService::new(store, cache.clone());

    service
        .save_region(Region {
            regional_multiplier: dec!(1.40),
            ..california()
        })
        .await
        .unwrap();

    let cached = cache.regions.get("US-CA").await.unwrap();
    assert_eq!(cached.regional_multiplier, dec!(1.40));
}
