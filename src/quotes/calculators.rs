//! Core quote totals calculation functions.
//!
//! Pure functions for quote math - no database access. Money is always
//! `Decimal`; binary floating point never enters a total.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

use super::models::{LineItemKind, QuoteLineItem};

/// Metadata key for an ad-hoc tax amount on a line item.
pub const METADATA_TAX_KEY: &str = "tax_amount";
/// Metadata key for an ad-hoc discount amount on a line item.
pub const METADATA_DISCOUNT_KEY: &str = "discount_amount";

/// Round to specified decimal places using round-half-up (midpoint away from zero).
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use greenbuild_quotes::quotes::round_money;
///
/// assert_eq!(round_money(dec!(0.005), 2), dec!(0.01));
/// assert_eq!(round_money(dec!(2.345), 2), dec!(2.35));
/// assert_eq!(round_money(dec!(-0.005), 2), dec!(-0.01));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to cents and pin the scale at two places, so `290` renders as `290.00`.
pub fn quantize(amount: Decimal) -> Decimal {
    let mut rounded = round_money(amount, 2);
    rounded.rescale(2);
    rounded
}

/// Total for a single line: `quantity × unit_cost`, scaled by the regional
/// multiplier only when the line opts in.
///
/// Returns `None` when the product leaves `Decimal`'s range.
pub fn line_total(
    quantity: Decimal,
    unit_cost: Decimal,
    regional_multiplier: Decimal,
    apply_region_multiplier: bool,
) -> Option<Decimal> {
    let base = quantity.checked_mul(unit_cost)?;
    let scaled = if apply_region_multiplier {
        base.checked_mul(regional_multiplier)?
    } else {
        base
    };
    Some(quantize(scaled))
}

/// Rolled-up amounts for a quote.
///
/// `total_amount` always equals
/// `subtotal + allowance + adjustment + tax - discount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteTotals {
    pub subtotal_amount: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub allowance_amount: Decimal,
    pub adjustment_amount: Decimal,
    pub total_amount: Decimal,
}

impl Default for QuoteTotals {
    fn default() -> Self {
        let zero = quantize(Decimal::ZERO);
        Self {
            subtotal_amount: zero,
            tax_amount: zero,
            discount_amount: zero,
            allowance_amount: zero,
            adjustment_amount: zero,
            total_amount: zero,
        }
    }
}

/// Aggregate line items into quote totals.
///
/// Line totals are computed from each item's quantity, unit cost, and
/// multiplier flag; any stored `total_amount` on the item is ignored.
/// Allowance and adjustment kinds feed their own buckets, everything else
/// feeds the subtotal. Metadata `tax_amount` / `discount_amount` values are
/// added regardless of kind.
///
/// Returns `None` if any intermediate amount overflows.
pub fn calculate_totals(regional_multiplier: Decimal, items: &[QuoteLineItem]) -> Option<QuoteTotals> {
    let mut subtotal = Decimal::ZERO;
    let mut allowance = Decimal::ZERO;
    let mut adjustment = Decimal::ZERO;
    let mut tax = Decimal::ZERO;
    let mut discount = Decimal::ZERO;

    for item in items {
        let total = item.compute_total(regional_multiplier)?;
        let bucket = match item.kind {
            LineItemKind::Allowance => &mut allowance,
            LineItemKind::Adjustment => &mut adjustment,
            LineItemKind::Base | LineItemKind::Option => &mut subtotal,
        };
        *bucket = bucket.checked_add(total)?;

        tax = tax.checked_add(metadata_amount(&item.metadata, METADATA_TAX_KEY))?;
        discount = discount.checked_add(metadata_amount(&item.metadata, METADATA_DISCOUNT_KEY))?;
    }

    let subtotal = quantize(subtotal);
    let allowance = quantize(allowance);
    let adjustment = quantize(adjustment);
    let tax = quantize(tax);
    let discount = quantize(discount);
    let total = subtotal
        .checked_add(allowance)?
        .checked_add(adjustment)?
        .checked_add(tax)?
        .checked_sub(discount)?;

    Some(QuoteTotals {
        subtotal_amount: subtotal,
        tax_amount: tax,
        discount_amount: discount,
        allowance_amount: allowance,
        adjustment_amount: adjustment,
        total_amount: quantize(total),
    })
}

/// Read a money amount from line item metadata.
///
/// Accepts JSON strings and numbers. Missing, null, or unparseable values
/// contribute zero.
pub fn metadata_amount(metadata: &Value, key: &str) -> Decimal {
    let parsed = match metadata.get(key) {
        None | Some(Value::Null) => return Decimal::ZERO,
        Some(Value::String(raw)) => parse_decimal(raw.trim()),
        Some(Value::Number(number)) => parse_decimal(&number.to_string()),
        Some(_) => None,
    };

    parsed.unwrap_or_else(|| {
        warn!(key, value = %metadata[key], "Ignoring unparseable line item metadata amount");
        Decimal::ZERO
    })
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
