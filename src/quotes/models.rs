//! Quote domain models.
//!
//! `*Row` structs use sqlx's FromRow derive for direct database deserialization
//! and are converted into the typed domain structs the engine and service use.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::calculators::{self, QuoteTotals};

/// Geographic pricing region; supplies currency and multiplier defaults.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
    pub currency_code: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub regional_multiplier: Decimal,
}

/// Quote lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    Declined,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Viewed => "viewed",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Declined)
    }

    /// Resolve the state reached by applying `action`.
    ///
    /// Re-sending a sent quote and re-viewing a viewed quote are accepted and
    /// leave the state unchanged. Terminal states reject everything.
    pub fn transition(self, action: QuoteAction) -> Result<QuoteStatus, TransitionError> {
        use QuoteAction as A;
        use QuoteStatus as S;

        let next = match (self, action) {
            (S::Draft | S::Sent, A::Send) => S::Sent,
            (S::Sent | S::Viewed, A::View) => S::Viewed,
            (S::Sent | S::Viewed, A::Accept) => S::Accepted,
            (S::Sent | S::Viewed, A::Decline) => S::Declined,
            (from, action) => return Err(TransitionError { from, action }),
        };
        Ok(next)
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "viewed" => Ok(Self::Viewed),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(UnknownValue::new("quote status", other)),
        }
    }
}

/// Explicit lifecycle actions a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteAction {
    Send,
    View,
    Accept,
    Decline,
}

impl QuoteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::View => "view",
            Self::Accept => "accept",
            Self::Decline => "decline",
        }
    }
}

impl fmt::Display for QuoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} a quote that is {from}")]
pub struct TransitionError {
    pub from: QuoteStatus,
    pub action: QuoteAction,
}

/// Line item classification; decides which bucket a line total lands in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    #[default]
    Base,
    Option,
    Allowance,
    Adjustment,
}

impl LineItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Option => "option",
            Self::Allowance => "allowance",
            Self::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for LineItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineItemKind {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "base" => Ok(Self::Base),
            "option" => Ok(Self::Option),
            "allowance" => Ok(Self::Allowance),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(UnknownValue::new("line item kind", other)),
        }
    }
}

/// A stored enum column held a value this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} '{value}'")]
pub struct UnknownValue {
    pub field: &'static str,
    pub value: String,
}

impl UnknownValue {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Priced proposal for a build or construction request.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub id: Uuid,
    pub region_code: String,
    pub title: String,
    pub status: QuoteStatus,
    pub currency_code: String,
    pub regional_multiplier: Decimal,
    pub totals: QuoteTotals,
    pub version: i32,
    pub parent_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// New draft quote with zero totals.
    pub fn draft(
        region_code: String,
        title: String,
        currency_code: String,
        regional_multiplier: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            region_code,
            title,
            status: QuoteStatus::Draft,
            currency_code,
            regional_multiplier,
            totals: QuoteTotals::default(),
            version: 1,
            parent_id: None,
            sent_at: None,
            viewed_at: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Draft copy of this quote linked back to it as a revision.
    pub fn revise(&self, now: DateTime<Utc>) -> Self {
        Self {
            version: self.version + 1,
            parent_id: Some(self.id),
            ..Self::draft(
                self.region_code.clone(),
                self.title.clone(),
                self.currency_code.clone(),
                self.regional_multiplier,
                now,
            )
        }
    }

    /// Recompute every line total and the quote rollup, returning the new total.
    ///
    /// Items are updated in place so callers can persist their totals
    /// alongside the quote. On overflow nothing is changed and `None` is
    /// returned.
    pub fn recalculate_totals(&mut self, items: &mut [QuoteLineItem]) -> Option<Decimal> {
        let totals = calculators::calculate_totals(self.regional_multiplier, items)?;
        for item in items.iter_mut() {
            item.total_amount = item.compute_total(self.regional_multiplier)?;
        }
        self.totals = totals;
        Some(self.totals.total_amount)
    }

    /// Apply a lifecycle action, stamping the matching timestamp.
    ///
    /// Returns `false` when the action was accepted but changed nothing.
    pub fn apply(&mut self, action: QuoteAction, now: DateTime<Utc>) -> Result<bool, TransitionError> {
        let next = self.status.transition(action)?;

        match action {
            QuoteAction::View if self.status == QuoteStatus::Viewed => return Ok(false),
            QuoteAction::Send => self.sent_at = Some(now),
            QuoteAction::View => self.viewed_at = Some(now),
            QuoteAction::Accept | QuoteAction::Decline => self.responded_at = Some(now),
        }

        self.status = next;
        self.updated_at = now;
        Ok(true)
    }

    pub fn is_editable(&self) -> bool {
        self.status == QuoteStatus::Draft
    }
}

/// One charge line owned by a quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteLineItem {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub kind: LineItemKind,
    pub description: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub apply_region_multiplier: bool,
    pub total_amount: Decimal,
    pub metadata: serde_json::Value,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuoteLineItem {
    pub fn from_new(quote_id: Uuid, position: i32, new: NewLineItem, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            quote_id,
            kind: new.kind,
            description: new.description,
            quantity: new.quantity,
            unit_cost: new.unit_cost,
            apply_region_multiplier: new.apply_region_multiplier,
            total_amount: Decimal::ZERO,
            metadata: new.metadata,
            position,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this item attached to another quote.
    pub fn copy_to(&self, quote_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            quote_id,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn compute_total(&self, regional_multiplier: Decimal) -> Option<Decimal> {
        calculators::line_total(
            self.quantity,
            self.unit_cost,
            regional_multiplier,
            self.apply_region_multiplier,
        )
    }

    pub fn apply_changes(&mut self, changes: LineItemChanges, now: DateTime<Utc>) {
        if let Some(kind) = changes.kind {
            self.kind = kind;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(quantity) = changes.quantity {
            self.quantity = quantity;
        }
        if let Some(unit_cost) = changes.unit_cost {
            self.unit_cost = unit_cost;
        }
        if let Some(apply) = changes.apply_region_multiplier {
            self.apply_region_multiplier = apply;
        }
        if let Some(metadata) = changes.metadata {
            self.metadata = metadata;
        }
        self.updated_at = now;
    }
}

/// Input for creating a quote.
#[derive(Debug, Clone, Default)]
pub struct NewQuote {
    pub region_code: String,
    pub title: String,
    pub currency_code: Option<String>,
    pub regional_multiplier: Option<Decimal>,
    pub items: Vec<NewLineItem>,
}

/// Input for creating a line item.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub kind: LineItemKind,
    pub description: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub apply_region_multiplier: bool,
    pub metadata: serde_json::Value,
}

impl NewLineItem {
    pub fn new(kind: LineItemKind, quantity: Decimal, unit_cost: Decimal) -> Self {
        Self {
            kind,
            description: String::new(),
            quantity,
            unit_cost,
            apply_region_multiplier: true,
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn without_multiplier(mut self) -> Self {
        self.apply_region_multiplier = false;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Partial update for an existing line item.
#[derive(Debug, Clone, Default)]
pub struct LineItemChanges {
    pub kind: Option<LineItemKind>,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub apply_region_multiplier: Option<bool>,
    pub metadata: Option<serde_json::Value>,
}

/// Quote row from quotes_quote
#[derive(Debug, Clone, FromRow)]
pub struct QuoteRow {
    pub id: Uuid,
    pub region_code: String,
    pub title: String,
    pub status: String,
    pub currency_code: String,
    pub regional_multiplier: Decimal,
    pub subtotal_amount: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub allowance_amount: Decimal,
    pub adjustment_amount: Decimal,
    pub total_amount: Decimal,
    pub version: i32,
    pub parent_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = UnknownValue;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            region_code: row.region_code,
            title: row.title,
            status: row.status.parse()?,
            currency_code: row.currency_code,
            regional_multiplier: row.regional_multiplier,
            totals: QuoteTotals {
                subtotal_amount: row.subtotal_amount,
                tax_amount: row.tax_amount,
                discount_amount: row.discount_amount,
                allowance_amount: row.allowance_amount,
                adjustment_amount: row.adjustment_amount,
                total_amount: row.total_amount,
            },
            version: row.version,
            parent_id: row.parent_id,
            sent_at: row.sent_at,
            viewed_at: row.viewed_at,
            responded_at: row.responded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Line item row from quotes_quotelineitem
#[derive(Debug, Clone, FromRow)]
pub struct QuoteLineItemRow {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub kind: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub apply_region_multiplier: bool,
    pub total_amount: Decimal,
    pub metadata: serde_json::Value,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<QuoteLineItemRow> for QuoteLineItem {
    type Error = UnknownValue;

    fn try_from(row: QuoteLineItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            quote_id: row.quote_id,
            kind: row.kind.parse()?,
            description: row.description,
            quantity: row.quantity,
            unit_cost: row.unit_cost,
            apply_region_multiplier: row.apply_region_multiplier,
            total_amount: row.total_amount,
            metadata: row.metadata,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
