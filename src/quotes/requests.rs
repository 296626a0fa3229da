//! Request DTOs for quote API endpoints.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::models::{LineItemChanges, LineItemKind, NewLineItem, NewQuote, QuoteStatus, Region};

/// Request to create or replace a region
#[derive(Debug, Deserialize)]
pub struct SaveRegionRequest {
    pub code: String,
    pub name: String,
    pub currency_code: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub regional_multiplier: Decimal,
}

impl From<SaveRegionRequest> for Region {
    fn from(req: SaveRegionRequest) -> Self {
        Region {
            code: req.code,
            name: req.name,
            currency_code: req.currency_code,
            regional_multiplier: req.regional_multiplier,
        }
    }
}

/// Request to create a draft quote
#[derive(Debug, Deserialize)]
pub struct CreateQuoteRequest {
    pub region_code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub regional_multiplier: Option<Decimal>,
    #[serde(default)]
    pub items: Vec<LineItemRequest>,
}

impl From<CreateQuoteRequest> for NewQuote {
    fn from(req: CreateQuoteRequest) -> Self {
        NewQuote {
            region_code: req.region_code,
            title: req.title,
            currency_code: req.currency_code,
            regional_multiplier: req.regional_multiplier,
            items: req.items.into_iter().map(NewLineItem::from).collect(),
        }
    }
}

/// A line item in a request
#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    #[serde(default)]
    pub kind: LineItemKind,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_cost: Decimal,
    #[serde(default = "default_apply_region_multiplier")]
    pub apply_region_multiplier: bool,
    #[serde(default = "default_metadata")]
    pub metadata: serde_json::Value,
}

fn default_apply_region_multiplier() -> bool {
    true
}

fn default_metadata() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl From<LineItemRequest> for NewLineItem {
    fn from(req: LineItemRequest) -> Self {
        NewLineItem {
            kind: req.kind,
            description: req.description,
            quantity: req.quantity,
            unit_cost: req.unit_cost,
            apply_region_multiplier: req.apply_region_multiplier,
            metadata: req.metadata,
        }
    }
}

/// Partial update of a line item
#[derive(Debug, Default, Deserialize)]
pub struct UpdateLineItemRequest {
    #[serde(default)]
    pub kind: Option<LineItemKind>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub quantity: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub apply_region_multiplier: Option<bool>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl From<UpdateLineItemRequest> for LineItemChanges {
    fn from(req: UpdateLineItemRequest) -> Self {
        LineItemChanges {
            kind: req.kind,
            description: req.description,
            quantity: req.quantity,
            unit_cost: req.unit_cost,
            apply_region_multiplier: req.apply_region_multiplier,
            metadata: req.metadata,
        }
    }
}

/// Request to recalculate totals, optionally from an explicit item set
#[derive(Debug, Default, Deserialize)]
pub struct RecalculateRequest {
    #[serde(default)]
    pub items: Option<Vec<LineItemRequest>>,
}

impl RecalculateRequest {
    pub fn into_items(self) -> Option<Vec<NewLineItem>> {
        self.items
            .map(|items| items.into_iter().map(NewLineItem::from).collect())
    }
}

/// Query parameters for quote listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuotesQuery {
    #[serde(default)]
    pub status: Option<QuoteStatus>,
}
