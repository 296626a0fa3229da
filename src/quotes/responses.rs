//! Response DTOs for quote API endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::cache::CacheStats;

use super::calculators::{quantize, QuoteTotals};
use super::models::{LineItemKind, Quote, QuoteLineItem, QuoteStatus};
use super::services::QuoteDetail;

/// Rolled-up quote amounts, always rendered with two decimal places
#[derive(Debug, Serialize)]
pub struct TotalsResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub subtotal_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub allowance_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub adjustment_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Decimal,
}

impl From<&QuoteTotals> for TotalsResponse {
    fn from(totals: &QuoteTotals) -> Self {
        Self {
            subtotal_amount: quantize(totals.subtotal_amount),
            tax_amount: quantize(totals.tax_amount),
            discount_amount: quantize(totals.discount_amount),
            allowance_amount: quantize(totals.allowance_amount),
            adjustment_amount: quantize(totals.adjustment_amount),
            total_amount: quantize(totals.total_amount),
        }
    }
}

/// Response for a quote without its items
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub id: Uuid,
    pub region_code: String,
    pub title: String,
    pub status: QuoteStatus,
    pub currency_code: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub regional_multiplier: Decimal,
    #[serde(flatten)]
    pub totals: TotalsResponse,
    pub version: i32,
    pub parent_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Quote> for QuoteResponse {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id,
            region_code: quote.region_code.clone(),
            title: quote.title.clone(),
            status: quote.status,
            currency_code: quote.currency_code.clone(),
            regional_multiplier: quote.regional_multiplier,
            totals: TotalsResponse::from(&quote.totals),
            version: quote.version,
            parent_id: quote.parent_id,
            sent_at: quote.sent_at,
            viewed_at: quote.viewed_at,
            responded_at: quote.responded_at,
            created_at: quote.created_at,
            updated_at: quote.updated_at,
        }
    }
}

/// Response for a single line item
#[derive(Debug, Serialize)]
pub struct LineItemResponse {
    pub id: Uuid,
    pub kind: LineItemKind,
    pub description: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_cost: Decimal,
    pub apply_region_multiplier: bool,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Decimal,
    pub metadata: serde_json::Value,
    pub position: i32,
}

impl From<&QuoteLineItem> for LineItemResponse {
    fn from(item: &QuoteLineItem) -> Self {
        Self {
            id: item.id,
            kind: item.kind,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_cost: item.unit_cost,
            apply_region_multiplier: item.apply_region_multiplier,
            total_amount: quantize(item.total_amount),
            metadata: item.metadata.clone(),
            position: item.position,
        }
    }
}

/// Response for a quote with its line items
#[derive(Debug, Serialize)]
pub struct QuoteDetailResponse {
    #[serde(flatten)]
    pub quote: QuoteResponse,
    pub items: Vec<LineItemResponse>,
}

impl From<&QuoteDetail> for QuoteDetailResponse {
    fn from(detail: &QuoteDetail) -> Self {
        Self {
            quote: QuoteResponse::from(&detail.quote),
            items: detail.items.iter().map(LineItemResponse::from).collect(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: CacheStats,
}

/// Generic error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
}
