//! Quote totals engine and quote lifecycle.
//!
//! Rolls line items up into subtotal, tax, discount, allowance, adjustment,
//! and total under a regional cost multiplier, and drives quotes through
//! draft, sent, viewed, accepted, and declined.

pub mod calculators;
pub mod memory;
pub mod models;
pub mod queries;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;
pub mod store;

// Re-export commonly used items
pub use calculators::{calculate_totals, round_money, QuoteTotals};
pub use memory::MemoryQuoteStore;
pub use queries::PgQuoteStore;
pub use routes::router;
pub use services::{QuoteDetail, QuoteError, QuoteService};
pub use store::{QuoteStore, StoreError};
